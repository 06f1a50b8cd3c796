use crate::cli::commands::CommandOutcome;
use crate::types::ServiceInfo;

/// Print a command outcome in human-readable format, or JSON where asked
pub fn print_outcome(outcome: &CommandOutcome) -> Result<(), serde_json::Error> {
    match outcome {
        CommandOutcome::Installed { name, path } => {
            println!("✅ Installed {name} at {}", path.display());
        }
        CommandOutcome::Uninstalled { name } => println!("🗑️  Uninstalled {name}"),
        CommandOutcome::Started { name } => println!("🚀 Started {name}"),
        CommandOutcome::Stopped { name } => println!("⏹️  Stopped {name}"),
        CommandOutcome::Info { info, json: true } => {
            println!("{}", serde_json::to_string_pretty(info)?);
        }
        CommandOutcome::Info { info, json: false } => print!("{}", format_info(info)),
        CommandOutcome::Rendered { content } => print!("{content}"),
    }
    Ok(())
}

/// Render an info snapshot as text
pub fn format_info(info: &ServiceInfo) -> String {
    let mut out = String::new();

    let state = if info.is_running {
        format!("✅ running (pid {})", info.pid)
    } else if info.is_installed() {
        "⚠️  installed, not running".to_string()
    } else {
        "❌ not installed".to_string()
    };

    out.push_str(&format!("📦 Service: {}\n", info.service.name));
    out.push_str(&format!("  • State: {state}\n"));
    out.push_str(&format!("  • File: {}\n", info.file_path.display()));
    if !info.service.executable.is_empty() {
        out.push_str(&format!("  • Executable: {}\n", info.service.executable));
    }
    if let Some(error) = &info.error {
        out.push_str(&format!("  • Error ({}): {error}\n", error.kind()));
    }
    out
}
