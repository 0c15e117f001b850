//! Implements the `Sheet` trait against Google Sheets.
//!
//! Everything goes through the typed `sheets::Client` except `addSheet`. Its typed
//! `SheetProperties` drops an `index` of zero when serialized, which Google reads as "append at the
//! end", so new month sheets could not be placed first. That one request is sent with `reqwest`.

use crate::api::{Sheet, SheetProps, SheetRange};
use crate::error::Res;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sheets::types::{
    BatchUpdateSpreadsheetRequest, BatchUpdateValuesRequest, DateTimeRenderOption, Dimension,
    InsertDataOption, Request, Spreadsheet, SpreadsheetProperties, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::trace;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait using the `sheets::Client` to interact with Google.
pub(crate) struct GoogleSheet {
    token: Option<String>,
    client: Option<sheets::Client>,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(crate) fn new() -> Self {
        Self {
            token: None,
            client: None,
            http: reqwest::Client::new(),
        }
    }

    fn client(&self) -> Res<&sheets::Client> {
        self.client
            .as_ref()
            .context("No access token has been attached to the Google Sheets client")
    }

    fn token(&self) -> Res<&str> {
        self.token
            .as_deref()
            .context("No access token has been attached to the Google Sheets client")
    }

    /// Sends one structural request with `spreadsheets.batchUpdate`.
    async fn batch_update(&self, spreadsheet_id: &str, request: Request) -> Res<()> {
        let body = BatchUpdateSpreadsheetRequest {
            include_spreadsheet_in_response: None,
            requests: vec![request],
            response_include_grid_data: None,
            response_ranges: Vec::new(),
        };
        self.client()?
            .spreadsheets()
            .batch_update(spreadsheet_id, &body)
            .await
            .map_err(map_client_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    fn attach(&mut self, token: &str) {
        if self.token.as_deref() == Some(token) {
            return;
        }
        self.token = Some(token.to_string());
        self.client = Some(create_sheets_client(token));
    }

    async fn create_spreadsheet(&mut self, title: &str) -> Res<String> {
        let body = Spreadsheet {
            data_source_schedules: Vec::new(),
            data_sources: Vec::new(),
            developer_metadata: Vec::new(),
            named_ranges: Vec::new(),
            properties: Some(SpreadsheetProperties {
                auto_recalc: None,
                default_format: None,
                iterative_calculation_settings: None,
                locale: String::new(),
                spreadsheet_theme: None,
                time_zone: String::new(),
                title: title.to_string(),
            }),
            sheets: Vec::new(),
            spreadsheet_id: String::new(),
            spreadsheet_url: String::new(),
        };
        let response = self
            .client()?
            .spreadsheets()
            .create(&body)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to create the spreadsheet '{title}'"))?;
        let id = response.body.spreadsheet_id;
        if id.is_empty() {
            bail!("Google Sheets API response missing 'spreadsheetId' field");
        }
        Ok(id)
    }

    async fn sheets(&mut self, spreadsheet_id: &str) -> Res<Vec<SheetProps>> {
        trace!("get {spreadsheet_id} metadata");
        let response = self
            .client()?
            .spreadsheets()
            .get(spreadsheet_id, false, &[])
            .await
            .map_err(map_client_error)
            .context("Failed to list the sheets of the spreadsheet")?;
        Ok(response
            .body
            .sheets
            .into_iter()
            .filter_map(|s| s.properties)
            .map(|p| SheetProps {
                id: p.sheet_id,
                title: p.title,
                hidden: p.hidden,
            })
            .collect())
    }

    async fn add_sheet(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        hidden: bool,
        index: Option<usize>,
    ) -> Res<i64> {
        let mut properties = json!({ "title": title, "hidden": hidden });
        if let Some(index) = index {
            properties["index"] = json!(index);
        }
        let url = format!("{SHEETS_API}/{spreadsheet_id}:batchUpdate");
        let body = json!({ "requests": [{ "addSheet": { "properties": properties } }] });
        trace!("POST {url}");
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token()?)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to the Google Sheets API")?;
        let reply = read_response(response)
            .await
            .with_context(|| format!("Failed to add the sheet '{title}'"))?;
        reply
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(|v| v.as_i64())
            // Google omits a sheet id of zero.
            .or(reply.pointer("/replies/0/addSheet/properties").map(|_| 0))
            .context("Google Sheets API addSheet reply missing 'properties' field")
    }

    async fn delete_sheet(&mut self, spreadsheet_id: &str, sheet_id: i64) -> Res<()> {
        let request = typed(json!({ "deleteSheet": { "sheetId": sheet_id } }))?;
        self.batch_update(spreadsheet_id, request)
            .await
            .with_context(|| format!("Failed to delete the sheet with id {sheet_id}"))
    }

    async fn bold_header(
        &mut self,
        spreadsheet_id: &str,
        sheet_id: i64,
        columns: usize,
    ) -> Res<()> {
        let request = typed(json!({
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": 0,
                    "endColumnIndex": columns,
                },
                "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                "fields": "userEnteredFormat.textFormat.bold",
            }
        }))?;
        self.batch_update(spreadsheet_id, request)
            .await
            .context("Failed to format the header row")
    }

    async fn get(&mut self, spreadsheet_id: &str, range: &str) -> Res<Vec<Vec<String>>> {
        trace!("get {range}");
        let response = self
            .client()?
            .spreadsheets()
            .values_get(
                spreadsheet_id,
                range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response.body.values)
    }

    async fn update(&mut self, spreadsheet_id: &str, data: &[SheetRange]) -> Res<()> {
        let value_ranges: Vec<ValueRange> = data
            .iter()
            .map(|sr| ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: sr.range.clone(),
                values: sr.values.clone(),
            })
            .collect();

        let request = BatchUpdateValuesRequest {
            data: value_ranges,
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(ValueInputOption::Raw),
        };

        self.client()?
            .spreadsheets()
            .values_batch_update(spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .context("Failed to write ranges")?;
        Ok(())
    }

    async fn append(
        &mut self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Res<()> {
        trace!("append {range}");
        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: range.to_string(),
            values: rows.to_vec(),
        };
        self.client()?
            .spreadsheets()
            .values_append(
                spreadsheet_id,
                range,
                false,
                InsertDataOption::InsertRows,
                DateTimeRenderOption::Noop,
                ValueRenderOption::Noop,
                ValueInputOption::Raw,
                &body,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to append rows to {range}"))?;
        Ok(())
    }
}

/// Builds one of the `sheets` request types from its JSON form. The generated types have no
/// `Default`, and `Request` alone has dozens of optional fields.
fn typed<T: DeserializeOwned>(value: Value) -> Res<T> {
    serde_json::from_value(value).context("Unable to build the Google Sheets request")
}

/// Turns a non-2xx response into an error that carries the status and body.
async fn read_response(response: reqwest::Response) -> Res<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        bail!("Google Sheets API request failed with status {status}: {body}");
    }
    response
        .json()
        .await
        .context("Failed to parse Google Sheets API response")
}

/// Creates a sheets client that uses `access_token`.
fn create_sheets_client(access_token: &str) -> sheets::Client {
    // The sheets crate requires client_id, client_secret, redirect_uri and refresh_token, but API
    // calls only need the access token.
    sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    )
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_repeat_cell() {
        let request: Request = typed(json!({
            "repeatCell": {
                "range": { "sheetId": 7, "endRowIndex": 1, "endColumnIndex": 7 },
                "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                "fields": "userEnteredFormat.textFormat.bold",
            }
        }))
        .unwrap();
        let repeat = request.repeat_cell.unwrap();
        assert_eq!(repeat.fields, "userEnteredFormat.textFormat.bold");
        let range = repeat.range.unwrap();
        assert_eq!(range.sheet_id, 7);
        assert_eq!(range.end_column_index, 7);
        let bold = repeat
            .cell
            .and_then(|c| c.user_entered_format)
            .and_then(|f| f.text_format)
            .map(|t| t.bold);
        assert_eq!(bold, Some(true));
        assert!(request.delete_sheet.is_none());
    }

    #[test]
    fn test_typed_rejects_malformed_requests() {
        assert!(typed::<Request>(json!({ "deleteSheet": "Sheet1" })).is_err());
    }

    #[test]
    fn test_spreadsheet_metadata_defaults() {
        let json = json!({
            "spreadsheetId": "abc",
            "sheets": [
                { "properties": { "title": "Sheet1" } },
                { "properties": { "sheetId": 42, "title": "_config", "hidden": true } }
            ]
        });
        let metadata: Spreadsheet = serde_json::from_value(json).unwrap();
        let props: Vec<_> = metadata
            .sheets
            .into_iter()
            .filter_map(|s| s.properties)
            .collect();
        assert_eq!(props[0].sheet_id, 0);
        assert!(!props[0].hidden);
        assert_eq!(props[1].sheet_id, 42);
        assert!(props[1].hidden);
    }

    #[tokio::test]
    async fn test_requests_need_a_token() {
        let mut sheet = GoogleSheet::new();
        assert!(sheet.get("id", "Sheet1!A1").await.is_err());
        assert!(sheet.sheets("id").await.is_err());
        assert!(sheet.add_sheet("id", "Tab", false, Some(0)).await.is_err());
    }
}
