use std::env;

use romkit::config::lang_tag;
use romkit::{Attrs, Detector, ImageType, Result, Settings, SystemNameKind};

fn main() -> Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| "game.gb".to_owned());
    let settings = Settings::from_env();
    println!("language: {}", lang_tag(settings.language));

    let mut h = Detector::new()
        .with_settings(settings)
        .open_path(&path, Attrs::NONE)?;

    println!("{path}: {}", h.class_name());
    if let Some(system) = h.system_name(SystemNameKind::Long) {
        println!("system: {system}");
    }
    for f in h.fields()?.iter() {
        match &f.value {
            Some(v) => println!("{}: {v:?}", f.name),
            None => println!("{}: (invalid)", f.name),
        }
    }
    for t in ImageType::ALL {
        if let Ok(Some(img)) = h.image(t) {
            println!("{t:?}: {}x{}", img.width(), img.height());
        }
    }

    Ok(())
}
