//! Google Sheets v4 values API.
use super::{CellAddress, SheetStore};
use crate::error::StoreError;
use crate::google::{http_agent, AccessToken};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct GoogleSheetsStore {
    agent: ureq::Agent,
    spreadsheet_id: String,
    token: AccessToken,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: &str, token: AccessToken, timeout: Duration) -> Self {
        GoogleSheetsStore {
            agent: http_agent(timeout),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        }
    }

    fn values_url(&self, range: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(SHEETS_API).map_err(|err| StoreError::Network(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Network("sheets API URL cannot be a base".to_string()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }
}

impl SheetStore for GoogleSheetsStore {
    fn read_all_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let mut url = self.values_url(&quote_sheet(sheet))?;
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");
        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", self.token.bearer())
            .call()
            .map_err(|err| StoreError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(classify_failure(sheet, status, body));
        }
        let range: ValueRange = response
            .body_mut()
            .read_json()
            .map_err(|err| StoreError::Network(err.to_string()))?;
        tracing::debug!(sheet, rows = range.values.len(), "sheet values fetched");
        Ok(range.values)
    }

    fn write_cell(
        &mut self,
        sheet: &str,
        cell: &CellAddress,
        value: &str,
    ) -> Result<(), StoreError> {
        let range = format!("{}!{}", quote_sheet(sheet), cell);
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });
        let mut response = self
            .agent
            .put(url.as_str())
            .header("Authorization", self.token.bearer())
            .send_json(&body)
            .map_err(|err| StoreError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(classify_failure(sheet, status, body));
        }
        tracing::debug!(sheet, %cell, "cell updated");
        Ok(())
    }
}

/// Quote a tab name for A1 notation, doubling embedded quotes.
fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// A range naming an unknown tab comes back as a 400 parse failure.
fn classify_failure(sheet: &str, status: u16, body: String) -> StoreError {
    if status == 400 && body.contains("Unable to parse range") {
        return StoreError::SheetNotFound(sheet.to_string());
    }
    StoreError::Api {
        status,
        message: body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_tab_names() {
        assert_eq!(quote_sheet("Master Sheet"), "'Master Sheet'");
        assert_eq!(quote_sheet("Bob's"), "'Bob''s'");
    }

    #[test]
    fn unknown_range_maps_to_missing_sheet() {
        let err = classify_failure(
            "Responses",
            400,
            r#"{"error": {"message": "Unable to parse range: 'Responses'"}}"#.to_string(),
        );
        assert!(err.is_missing_sheet());
        let err = classify_failure("Master", 403, "PERMISSION_DENIED".to_string());
        assert!(matches!(err, StoreError::Api { status: 403, .. }));
    }

    #[test]
    fn values_url_escapes_range() {
        let store = GoogleSheetsStore::new(
            "sheet-id",
            AccessToken::new("t").expect("token"),
            Duration::from_secs(5),
        );
        let url = store.values_url("'Master Sheet'!E2").expect("url");
        assert!(url
            .as_str()
            .starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/"));
        assert!(url.as_str().contains("Master%20Sheet"));
    }
}
