use std::error::Error;
use std::path::PathBuf;

use watermark_processor::{load_transformer, process_image};

/// Usage: watermark-processor <input> <output.jpg> [text] [config.yaml]
fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        return Err("usage: watermark-processor <input> <output.jpg> [text] [config.yaml]".into());
    };
    let text = args.next();
    let config = args.next().map(PathBuf::from);

    let transformer = load_transformer(config.as_deref())?;
    let data = std::fs::read(&input)?;
    let image = process_image(&transformer, &data, None, text.as_deref())?;
    std::fs::write(&output, &image.data)?;

    println!(
        "{input} ({}, {}x{}) -> {output} ({} bytes)",
        image.source_format,
        image.width,
        image.height,
        image.data.len()
    );

    Ok(())
}
