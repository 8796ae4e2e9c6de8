use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::format_amount;

const RATE_NOTE: &str =
    "(Note: Rates are approximations for planning purposes only)";

/// Rates from a currency to each currency it converts into directly.
type RateTable = [(&'static str, &'static [(&'static str, f64)])];

/// Approximate rates as of early 2025.
const RATES: &RateTable = &[
    (
        "USD",
        &[
            ("EUR", 0.92),
            ("GBP", 0.79),
            ("JPY", 149.50),
            ("CAD", 1.35),
            ("AUD", 1.52),
            ("CNY", 7.20),
            ("INR", 83.20),
            ("MXN", 17.05),
        ],
    ),
    (
        "EUR",
        &[
            ("USD", 1.09),
            ("GBP", 0.86),
            ("JPY", 163.00),
            ("CAD", 1.47),
            ("AUD", 1.66),
            ("CNY", 7.85),
            ("INR", 90.70),
            ("MXN", 18.60),
        ],
    ),
    (
        "GBP",
        &[
            ("USD", 1.27),
            ("EUR", 1.16),
            ("JPY", 189.30),
            ("CAD", 1.71),
            ("AUD", 1.92),
            ("CNY", 9.10),
            ("INR", 105.30),
            ("MXN", 21.60),
        ],
    ),
    (
        "JPY",
        &[
            ("USD", 0.0067),
            ("EUR", 0.0061),
            ("GBP", 0.0053),
            ("CAD", 0.0090),
            ("AUD", 0.0102),
            ("CNY", 0.0482),
            ("INR", 0.5565),
            ("MXN", 0.1141),
        ],
    ),
    (
        "CAD",
        &[
            ("USD", 0.74),
            ("EUR", 0.68),
            ("GBP", 0.58),
            ("JPY", 110.70),
            ("AUD", 1.13),
            ("CNY", 5.33),
            ("INR", 61.60),
            ("MXN", 12.60),
        ],
    ),
    (
        "AUD",
        &[
            ("USD", 0.66),
            ("EUR", 0.60),
            ("GBP", 0.52),
            ("JPY", 98.40),
            ("CAD", 0.89),
            ("CNY", 4.73),
            ("INR", 54.70),
            ("MXN", 11.20),
        ],
    ),
    (
        "CNY",
        &[
            ("USD", 0.14),
            ("EUR", 0.13),
            ("GBP", 0.11),
            ("JPY", 20.80),
            ("CAD", 0.19),
            ("AUD", 0.21),
            ("INR", 11.60),
            ("MXN", 2.37),
        ],
    ),
    (
        "INR",
        &[
            ("USD", 0.012),
            ("EUR", 0.011),
            ("GBP", 0.0095),
            ("JPY", 1.80),
            ("CAD", 0.016),
            ("AUD", 0.018),
            ("CNY", 0.086),
            ("MXN", 0.205),
        ],
    ),
    (
        "MXN",
        &[
            ("USD", 0.059),
            ("EUR", 0.054),
            ("GBP", 0.046),
            ("JPY", 8.77),
            ("CAD", 0.079),
            ("AUD", 0.089),
            ("CNY", 0.422),
            ("INR", 4.88),
        ],
    ),
];

#[derive(Deserialize, JsonSchema)]
pub struct ConvertCurrencyParameters {
    #[schemars(description = "The amount to convert.")]
    amount: f64,
    #[schemars(description = "Source currency code (e.g., USD, EUR).")]
    from_currency: String,
    #[schemars(description = "Target currency code (e.g., JPY, GBP).")]
    to_currency: String,
}

/// Converts an amount between currencies for travel budgeting.
pub struct ConvertCurrencyTool {
    live: Option<(Client, String)>,
    parameter_schema: Value,
}

impl ConvertCurrencyTool {
    /// Creates a converter that only uses the built-in rate table.
    #[inline]
    pub fn new() -> Self {
        ConvertCurrencyTool {
            live: None,
            parameter_schema: schema_for!(ConvertCurrencyParameters)
                .to_value(),
        }
    }

    /// Asks ExchangeRate-API first, falling back to the rate table.
    pub fn with_api_key(mut self, client: Client, api_key: String) -> Self {
        self.live = Some((client, api_key));
        self
    }
}

impl Default for ConvertCurrencyTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ConvertCurrencyTool {
    type Input = ConvertCurrencyParameters;

    fn name(&self) -> &str {
        "convert_currency"
    }

    fn description(&self) -> &str {
        "Converts an amount between currencies for travel budgeting."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ConvertCurrencyParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let live = self.live.clone();
        async move {
            let amount = input.amount;
            if !amount.is_finite() || amount < 0.0 {
                return Err(ToolError::invalid_input().with_reason(
                    "`amount` must be a non-negative number",
                ));
            }
            let from = input.from_currency.trim().to_uppercase();
            let to = input.to_currency.trim().to_uppercase();

            let live = live
                .filter(|_| is_currency_code(&from) && is_currency_code(&to));
            if let Some((client, api_key)) = live {
                match fetch_live_rate(&client, &api_key, amount, &from, &to)
                    .await
                {
                    Ok(Some(text)) => return Ok(text),
                    Ok(None) => {
                        debug!("exchange rate API has no data for {from}/{to}");
                    }
                    Err(err) => {
                        warn!("exchange rate API failed: {err}");
                    }
                }
            }

            Ok(convert_with(RATES, amount, &from, &to))
        }
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

fn rates_from(
    rates: &RateTable,
    code: &str,
) -> Option<&'static [(&'static str, f64)]> {
    rates
        .iter()
        .find(|(from, _)| *from == code)
        .map(|(_, rates)| *rates)
}

fn rate(rates: &RateTable, from: &str, to: &str) -> Option<f64> {
    rates_from(rates, from)?
        .iter()
        .find(|(code, _)| *code == to)
        .map(|(_, rate)| *rate)
}

fn conversion_text(
    amount: f64,
    from: &str,
    converted: f64,
    to: &str,
    rate: &str,
    source: &str,
) -> String {
    format!(
        "💱 {} {from} = {} {to}\n\nExchange rate: 1 {from} = {rate} {to}\n\n{source}",
        format_amount(amount),
        format_amount(converted),
    )
}

fn convert_with(
    rates: &RateTable,
    amount: f64,
    from: &str,
    to: &str,
) -> String {
    if rates_from(rates, from).is_none() {
        return format!("Sorry, I don't have exchange rate data for {from}.");
    }
    if from == to {
        let amount = format_amount(amount);
        return format!("{amount} {from} = {amount} {to}");
    }
    if let Some(rate) = rate(rates, from, to) {
        return conversion_text(
            amount,
            from,
            amount * rate,
            to,
            &rate.to_string(),
            RATE_NOTE,
        );
    }
    let via_usd = (rate(rates, from, "USD"), rate(rates, "USD", to));
    if let (Some(to_usd), Some(from_usd)) = via_usd {
        let effective = to_usd * from_usd;
        return conversion_text(
            amount,
            from,
            amount * effective,
            to,
            &format!("{effective:.4}"),
            RATE_NOTE,
        );
    }
    format!("Sorry, I don't have exchange rate data from {from} to {to}.")
}

#[derive(Deserialize)]
struct PairResponse {
    result: String,
    conversion_rate: Option<f64>,
    conversion_result: Option<f64>,
}

async fn fetch_live_rate(
    client: &Client,
    api_key: &str,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<Option<String>, reqwest::Error> {
    let url = format!(
        "https://v6.exchangerate-api.com/v6/{api_key}/pair/{from}/{to}/{amount}"
    );
    let resp: PairResponse =
        client.get(url).send().await?.error_for_status()?.json().await?;
    if resp.result != "success" {
        return Ok(None);
    }
    let (Some(rate), Some(converted)) =
        (resp.conversion_rate, resp.conversion_result)
    else {
        return Ok(None);
    };
    Ok(Some(conversion_text(
        amount,
        from,
        converted,
        to,
        &rate.to_string(),
        "(Data from ExchangeRate-API)",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(amount: f64, from: &str, to: &str) -> ConvertCurrencyParameters {
        ConvertCurrencyParameters {
            amount,
            from_currency: from.to_owned(),
            to_currency: to.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_direct_rate() {
        let tool = ConvertCurrencyTool::new();
        let output = tool.execute(input(1000.0, " usd", "jpy ")).await.unwrap();
        assert_eq!(
            output,
            "💱 1,000.00 USD = 149,500.00 JPY\n\n\
             Exchange rate: 1 USD = 149.5 JPY\n\n\
             (Note: Rates are approximations for planning purposes only)"
        );
    }

    #[tokio::test]
    async fn test_same_currency() {
        let tool = ConvertCurrencyTool::new();
        let output = tool.execute(input(12.5, "eur", "EUR")).await.unwrap();
        assert_eq!(output, "12.50 EUR = 12.50 EUR");
    }

    #[tokio::test]
    async fn test_unknown_currencies() {
        let tool = ConvertCurrencyTool::new();
        let output = tool.execute(input(5.0, "xyz", "usd")).await.unwrap();
        assert_eq!(output, "Sorry, I don't have exchange rate data for XYZ.");

        let output = tool.execute(input(5.0, "usd", "chf")).await.unwrap();
        assert_eq!(
            output,
            "Sorry, I don't have exchange rate data from USD to CHF."
        );
    }

    #[tokio::test]
    async fn test_invalid_amount() {
        let tool = ConvertCurrencyTool::new();
        let err = tool.execute(input(-1.0, "usd", "eur")).await.unwrap_err();
        assert_eq!(err.kind(), journi_core::tool::ErrorKind::InvalidInput);
        assert!(tool.execute(input(f64::NAN, "usd", "eur")).await.is_err());
    }

    #[test]
    fn test_rate_lookup() {
        assert_eq!(rate(RATES, "JPY", "USD"), Some(0.0067));
        assert_eq!(rate(RATES, "USD", "USD"), None);
        assert_eq!(rate(RATES, "CHF", "USD"), None);
    }

    #[test]
    fn test_conversion_through_usd() {
        const PARTIAL: &RateTable = &[
            ("CHF", &[("USD", 1.25)]),
            ("USD", &[("EUR", 0.92), ("CHF", 0.8)]),
        ];

        assert_eq!(
            convert_with(PARTIAL, 200.0, "CHF", "EUR"),
            "💱 200.00 CHF = 230.00 EUR\n\n\
             Exchange rate: 1 CHF = 1.1500 EUR\n\n\
             (Note: Rates are approximations for planning purposes only)"
        );
        assert_eq!(
            convert_with(PARTIAL, 10.0, "USD", "CHF"),
            "💱 10.00 USD = 8.00 CHF\n\n\
             Exchange rate: 1 USD = 0.8 CHF\n\n\
             (Note: Rates are approximations for planning purposes only)"
        );
        assert_eq!(
            convert_with(PARTIAL, 10.0, "USD", "GBP"),
            "Sorry, I don't have exchange rate data from USD to GBP."
        );
    }
}
