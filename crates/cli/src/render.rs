use serde::Serialize;
use storage::{FileKind, TrackedFile};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with one decimal, base 1024.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} PB")
}

pub fn record_line(item: &TrackedFile) -> String {
    let rec = &item.record;
    let marker = match rec.kind {
        FileKind::Directory => "d",
        FileKind::File => "-",
    };
    let tags = if rec.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", rec.tags.join(", "))
    };
    format!(
        "{marker} {}{tags}  {}  created {}  modified {}  {} ({})",
        item.path,
        format_size(rec.size),
        rec.created_at,
        rec.modified_at,
        rec.owner.name,
        rec.owner.uid,
    )
}

/// Sectioned key/value view of one record.
pub fn meta_lines(item: &TrackedFile) -> Vec<String> {
    let rec = &item.record;
    vec![
        "File:".to_string(),
        format!("  path      {}", item.path),
        format!("  name      {}", rec.filename),
        format!("  type      {}", rec.kind.as_str()),
        format!("  size      {} ({} bytes)", format_size(rec.size), rec.size),
        "Times:".to_string(),
        format!("  created   {}", rec.created_at),
        format!("  modified  {}", rec.modified_at),
        "Owner:".to_string(),
        format!("  name      {}", rec.owner.name),
        format!("  uid       {}", rec.owner.uid),
        "Tags:".to_string(),
        format!("  {}", rec.tags.join(", ")),
    ]
}

pub fn print_records(items: &[TrackedFile], title: &str, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&items);
    }
    println!("{title}");
    if items.is_empty() {
        println!("No items found.");
        return Ok(());
    }
    for item in items {
        println!("{}", record_line(item));
    }
    println!("Total: {} items", items.len());
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
