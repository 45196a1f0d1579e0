// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rendering of entry listings.

use comfy_table::{ContentArrangement, Table};
use nvs_app_core::prefs::OutputFormat;
use nvs_core::{EntryRecord, Value};

/// Display text of a record's value. Signed tags are shown sign-extended
/// when `sign_extend` is set; unset entries read `<unset>`.
pub fn value_text(record: &EntryRecord, sign_extend: bool) -> String {
    match &record.value {
        None => "<unset>".to_owned(),
        Some(Value::Uint(raw)) if sign_extend => record
            .tag
            .sign_extend(*raw)
            .map_or_else(|| raw.to_string(), |signed| signed.to_string()),
        Some(value) => value.to_string(),
    }
}

/// Render `records` in `format`.
///
/// JSON carries the stored values untouched; `sign_extend` only affects the
/// text and table renderings.
pub fn render(
    records: &[EntryRecord],
    format: OutputFormat,
    sign_extend: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(records
            .iter()
            .map(|r| {
                format!(
                    "{}.{} = {}\n",
                    r.namespace,
                    r.key,
                    value_text(r, sign_extend)
                )
            })
            .collect()),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Namespace", "Key", "Tag", "Value"]);
            for record in records {
                table.add_row(vec![
                    record.namespace.clone(),
                    record.key.clone(),
                    record.tag.to_string(),
                    value_text(record, sign_extend),
                ]);
            }
            Ok(format!("{table}\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)? + "\n"),
    }
}
