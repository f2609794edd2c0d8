//! List the archives of one category and download them.
//!
//! Run:
//! `cargo run --example browse_archives -- MOTOR_CONTROL /tmp/astr`
//!
//! Required env vars: `LIBASTR_URL`, `LIBASTR_EMAIL`, `LIBASTR_TOKEN`.

use astr_client::{ArchiveQuery, Browser};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let category = args.next().ok_or("usage: browse_archives <category> [dir]")?;
    let target = args.next().unwrap_or_else(|| ".".to_owned());

    let browser = Browser::from_env()?;
    let archives = browser.get_archives_by_args(&ArchiveQuery::new().category(&category))?;
    println!("{} archive(s) in {category}", archives.len());

    for archive in &archives {
        println!("- {} by {} on {}", archive.id(), archive.author(), archive.date());
        for (name, value) in archive.descriptors() {
            println!("    {name} = {value}");
        }
        let path = archive.download(&target)?;
        println!("    saved to {}", path.display());
    }
    Ok(())
}
