use anyhow::Result;
use stager_core::configs::manager::manager_config_schema;

use crate::ConfigCommands;

pub fn execute(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Schema => {
            let schema = manager_config_schema()?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}
