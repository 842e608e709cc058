//! Modules command implementation.

use ndk_engine::{ProcMapsFinder, Value};
use std::path::Path;
use std::sync::Arc;

/// Runs the modules command.
pub fn run(maps: Option<&Path>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(maps) = maps {
        if !maps.is_file() {
            return Err(format!("No mappings file at {:?}", maps).into());
        }
        ndk_engine::set_module_finder(Arc::new(ProcMapsFinder::new(maps)));
    }

    let modules = ndk_engine::get_modules_list();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&modules)?);
        }
        _ => print_text_output(&modules),
    }

    Ok(())
}

fn print_text_output(modules: &Value) {
    println!("Loaded modules: {}", modules.len());
    for image in modules.items() {
        println!(
            "  {:>18} {:>10} {} {}",
            image.get_by_key("image_addr").as_string(),
            image.get_by_key("image_size").as_i32(),
            image.get_by_key("code_id").as_str().unwrap_or("-"),
            image.get_by_key("code_file").as_string(),
        );
    }
}
