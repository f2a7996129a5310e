use std::fs;

fn main() -> anyhow::Result<()> {
    // The package name has a hyphen; the crate identifier uses '_'.
    let doc = task_tracker::docs::build_openapi(8000)?;
    let s = serde_json::to_string_pretty(&doc)?;
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    fs::write(&path, s)?;
    println!("wrote {}", path);
    Ok(())
}
