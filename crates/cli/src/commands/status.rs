//! `ctxlink status` — Show the effective configuration.

use ctxlink_config::AppConfig;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔗 ctxlink Status");
    println!("================");
    let config_path = AppConfig::config_path();
    println!("  Config file:  {}", config_path.display());
    println!("  Listen:       {}", config.server.addr());
    println!("  Model:        {}", config.model.default_model_id);
    println!("  Template:     {}", config.model.response_template);
    println!("  Log level:    {}", config.logging.level);
    println!("  Log format:   {}", if config.logging.json { "json" } else { "text" });

    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults. Example config.toml:\n");
        println!("{}", AppConfig::default_toml());
    }

    Ok(())
}
