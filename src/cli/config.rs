use std::fs;
use std::path::PathBuf;

const SAMPLE_CONFIG: &str = include_str!("../../samples/sample-config.yml");

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    write_config(SAMPLE_CONFIG, stdout)
}

fn write_config(config_content: &str, stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Try ~/.config/n2kplay/config.yml first, fall back to /etc/n2kplay
    let config_path = dirs::home_dir()
        .map(|home| home.join(".config/n2kplay/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/n2kplay/config.yml"));

    if config_path.exists() {
        eprintln!(
            "Error: Config file already exists at {}",
            config_path.display()
        );
        eprintln!("Remove it first or use --stdout to print the config");
        std::process::exit(1);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, config_content)?;
    println!("Wrote config to {}", config_path.display());
    println!("Edit it to point input.path at a log file, then run 'n2kplay run'.");

    Ok(())
}
