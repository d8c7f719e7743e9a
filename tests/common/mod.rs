#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use labelkit::config::{save_classes, save_settings, ClassEntry, ClassRegistry, Settings};
use labelkit::ir::ClassId;

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160]))
        .save(path)
        .expect("write png file");
}

pub fn classes() -> ClassRegistry {
    ClassRegistry::new(vec![
        ClassEntry {
            id: ClassId(0),
            name: "cow".into(),
            color: "#00FF00".into(),
        },
        ClassEntry {
            id: ClassId(1),
            name: "sheep".into(),
            color: "#0000FF".into(),
        },
        ClassEntry {
            id: ClassId(2),
            name: "dog".into(),
            color: "#FFAA00".into(),
        },
    ])
}

/// Writes a config directory with relative folder names and returns the
/// settings as the library resolves them.
pub fn write_config(dir: &Path, delete_mode: bool) -> Settings {
    let settings = Settings {
        delete_mode,
        ..Settings::default()
    };
    save_settings(dir, &settings).expect("write settings");
    save_classes(dir, &classes()).expect("write classes");

    let mut resolved = settings;
    resolved.resolve_paths(dir);
    fs::create_dir_all(&resolved.input_folder).expect("create input folder");
    resolved
}

pub fn input_image(settings: &Settings, name: &str, width: u32, height: u32) -> PathBuf {
    let path = settings.input_folder.join(name);
    write_png(&path, width, height);
    path
}
