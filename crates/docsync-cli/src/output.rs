//! Human and JSON renderings of command output
//!
//! Besides plain status lines, formatters know how to print the two things
//! docsync shows: a document list and the row operations between two lists.

use std::path::Path;

use docsync_core::domain::metadata::MetadataItem;
use docsync_sync::ListChanges;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// One row of a document listing
#[derive(Debug, Clone, Copy)]
pub struct DocumentRow<'a> {
    pub item: &'a MetadataItem,
    pub conflicted: bool,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);

    /// Documents found under `root`, in snapshot order
    fn print_documents(&self, root: &Path, rows: &[DocumentRow<'_>]);

    /// Row operations turning `previous` into `current`
    fn print_changes(&self, previous: &[MetadataItem], current: &[MetadataItem], changes: &ListChanges);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}

    fn print_documents(&self, root: &Path, rows: &[DocumentRow<'_>]) {
        self.success(&format!(
            "{} document{} in {}",
            rows.len(),
            if rows.len() == 1 { "" } else { "s" },
            root.display()
        ));
        for line in describe_documents(rows) {
            self.info(&line);
        }
    }

    fn print_changes(&self, previous: &[MetadataItem], current: &[MetadataItem], changes: &ListChanges) {
        for line in describe_changes(previous, current, changes) {
            println!("{line}");
        }
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }

    fn print_documents(&self, root: &Path, rows: &[DocumentRow<'_>]) {
        self.print_json(&documents_json(root, rows));
    }

    // One compact object per line so `watch` output can be streamed.
    fn print_changes(&self, previous: &[MetadataItem], current: &[MetadataItem], changes: &ListChanges) {
        println!("{}", changes_json(previous, current, changes));
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// JSON view of one presented item
fn item_json(item: &MetadataItem) -> serde_json::Value {
    serde_json::json!({
        "name": item.name(),
        "url": item.url().to_string(),
        "handle": item.remote_handle().as_str(),
    })
}

fn documents_json(root: &Path, rows: &[DocumentRow<'_>]) -> serde_json::Value {
    let items: Vec<_> = rows
        .iter()
        .map(|row| {
            let mut json = item_json(row.item);
            json["conflicted"] = serde_json::Value::Bool(row.conflicted);
            json
        })
        .collect();
    serde_json::json!({
        "root": root.display().to_string(),
        "count": items.len(),
        "items": items,
    })
}

fn describe_documents(rows: &[DocumentRow<'_>]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let marker = if row.conflicted { " (in conflict)" } else { "" };
            format!("{}{}", row.item.name(), marker)
        })
        .collect()
}

fn changes_json(previous: &[MetadataItem], current: &[MetadataItem], changes: &ListChanges) -> serde_json::Value {
    let pick = |items: &[MetadataItem], positions: &[usize]| -> Vec<serde_json::Value> {
        positions.iter().map(|&i| item_json(&items[i])).collect()
    };
    serde_json::json!({
        "count": current.len(),
        "deleted": pick(previous, &changes.deletions),
        "inserted": pick(current, &changes.insertions),
        "reloaded": pick(current, &changes.reloads),
    })
}

/// One line per operation: `-` deleted, `+` inserted, `~` reloaded
fn describe_changes(previous: &[MetadataItem], current: &[MetadataItem], changes: &ListChanges) -> Vec<String> {
    let deleted = changes.deletions.iter().map(|&i| format!("- {}", previous[i].name()));
    let inserted = changes.insertions.iter().map(|&i| format!("+ {}", current[i].name()));
    let reloaded = changes.reloads.iter().map(|&i| format!("~ {}", current[i].name()));
    deleted.chain(inserted).chain(reloaded).collect()
}

#[cfg(test)]
mod tests {
    use docsync_core::domain::newtypes::{DocLocation, RemoteHandle};
    use docsync_sync::reconcile;

    use super::*;

    fn item(name: &str, handle: &str) -> MetadataItem {
        MetadataItem::new(
            RemoteHandle::new(handle),
            DocLocation::new(format!("/store/{name}")).unwrap(),
        )
    }

    #[test]
    fn test_describe_changes() {
        let previous = vec![item("a.shoebox", "1"), item("b.shoebox", "1")];
        let current = vec![item("a.shoebox", "2"), item("c.shoebox", "1")];

        let changes = reconcile(&previous, &current);
        let lines = describe_changes(&previous, &current, &changes);

        assert_eq!(lines, vec!["- b.shoebox", "+ c.shoebox", "~ a.shoebox"]);
    }

    #[test]
    fn test_describe_moved_document() {
        let previous = vec![item("a.shoebox", "1"), item("b.shoebox", "1")];
        let current = vec![item("b.shoebox", "1"), item("a.shoebox", "1")];

        let changes = reconcile(&previous, &current);
        let lines = describe_changes(&previous, &current, &changes);

        assert_eq!(lines, vec!["- a.shoebox", "+ a.shoebox"]);
    }

    #[test]
    fn test_describe_no_changes() {
        let items = vec![item("a.shoebox", "1")];
        let changes = reconcile(&items, &items);
        assert!(describe_changes(&items, &items, &changes).is_empty());
    }

    #[test]
    fn test_changes_json_names_items_by_side() {
        let previous = vec![item("a.shoebox", "1"), item("b.shoebox", "1")];
        let current = vec![item("a.shoebox", "1"), item("c.shoebox", "7")];

        let changes = reconcile(&previous, &current);
        let json = changes_json(&previous, &current, &changes);

        assert_eq!(json["count"], 2);
        assert_eq!(json["deleted"][0]["name"], "b.shoebox");
        assert_eq!(json["inserted"][0]["handle"], "7");
        assert_eq!(json["reloaded"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_documents_flag_conflicts() {
        let a = item("a.shoebox", "1");
        let b = item("b.shoebox", "1");
        let rows = [
            DocumentRow { item: &a, conflicted: false },
            DocumentRow { item: &b, conflicted: true },
        ];

        assert_eq!(describe_documents(&rows), vec!["a.shoebox", "b.shoebox (in conflict)"]);

        let json = documents_json(Path::new("/store"), &rows);
        assert_eq!(json["root"], "/store");
        assert_eq!(json["count"], 2);
        assert_eq!(json["items"][1]["conflicted"], true);
        assert_eq!(json["items"][0]["url"], "/store/a.shoebox");
    }

    #[test]
    fn test_get_formatter_follows_format() {
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::Human.is_json());
        let _ = get_formatter(OutputFormat::Human);
    }
}
