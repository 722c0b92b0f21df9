mod common;

use pretty_assertions::assert_eq;
use rstest::rstest;

use common::*;
use romkit::config::{LC_DE, LC_JA};
use romkit::{
    Attrs, Detector, DetectorConfig, FormatHandler, ImageType, Property, Settings, SharedFile,
    SystemNameKind, create,
};

#[rstest]
#[case::xdbf(xdbf(&[(1, &[(0x8000, "Title")][..])]), "t.xdbf", "Xbox360_XDBF")]
#[case::smdh(smdh("Icon"), "icon.smdh", "Nintendo3DS_SMDH")]
#[case::dmg(dmg("TETRIS"), "t.gb", "DMG")]
#[case::gbs(gbs("Tune"), "t.gbs", "GBS")]
#[case::vgm(vgm(), "t.vgm", "VGM")]
#[case::sid(sid("Commando"), "t.sid", "SID")]
#[case::bnr(bnr1("Game"), "opening.bnr", "GameCubeBNR")]
#[case::gamecom_low(gamecom(0), "g.bin", "GameCom")]
#[case::gamecom_high(gamecom(0x40000), "g.tgc", "GameCom")]
#[case::wonderswan(wonderswan(false), "g.ws", "WonderSwan")]
#[case::vms(vms("SAVE"), "save.vms", "DreamcastSave")]
#[case::vmi(vmi("SAVE"), "save.vmi", "DreamcastSave")]
fn test_every_format_detected(#[case] data: Vec<u8>, #[case] name: &str, #[case] class: &str) {
    let file = mem(data, name);
    let h = create(&file, Attrs::NONE).unwrap();
    assert!(h.is_valid());
    assert_eq!(h.class_name(), class);
    assert!(h.system_name(SystemNameKind::Long).is_some_and(|s| !s.is_empty()));
}

/// Every prefix of a sample below its fixed header size is rejected, and
/// whatever is accepted can be read without panicking.
#[rstest]
#[case::xdbf(xdbf(&[(1, &[(0x8000, "Title")][..])]), "t.xdbf", 0x18)]
#[case::smdh(smdh("Icon"), "icon.smdh", 0x36C0)]
#[case::dmg(dmg("TETRIS"), "t.gb", 0x150)]
#[case::gbs(gbs("Tune"), "t.gbs", 0x70)]
#[case::vgm(vgm(), "t.vgm", 0x40)]
#[case::sid(sid("Commando"), "t.sid", 0x76)]
#[case::bnr(bnr1("Game"), "opening.bnr", 0x1960)]
#[case::gamecom_low(gamecom(0), "g.bin", 0x20)]
#[case::gamecom_high(gamecom(0x40000), "g.tgc", 0x40020)]
#[case::wonderswan(wonderswan(false), "g.ws", 0x4000)]
#[case::vms(vms("SAVE"), "save.vms", 0x80)]
#[case::vmi(vmi("SAVE"), "save.vmi", 0x6C)]
fn test_truncated_samples(#[case] data: Vec<u8>, #[case] name: &str, #[case] min_len: usize) {
    for len in 0..=data.len().min(0x4000) {
        let file = mem(data[..len].to_vec(), name);
        let Some(mut h) = create(&file, Attrs::NONE) else {
            continue;
        };
        assert!(len >= min_len, "{name} accepted at {len} bytes");
        let _ = h.fields();
        let _ = h.metadata();
        for t in ImageType::ALL {
            let _ = h.image(t);
        }
        let _ = h.icon_anim();
    }
}

#[test]
fn test_reread_only_for_allowed_extensions() {
    let data = gamecom(0x40000);
    assert!(create(&mem(data.clone(), "g.tgc"), Attrs::NONE).is_some());
    assert!(create(&mem(data.clone(), "g.dat"), Attrs::NONE).is_none());

    let d = Detector::new().with_config(DetectorConfig::new().reread_exts([".dat"]));
    assert_eq!(d.create(&mem(data, "g.dat"), Attrs::NONE).unwrap().class_name(), "GameCom");
}

#[test]
fn test_footer_needs_matching_extension() {
    let data = wonderswan(true);
    let h = create(&mem(data.clone(), "g.wsc"), Attrs::NONE).unwrap();
    assert_eq!(h.system_name(SystemNameKind::Abbreviation), Some("WSC"));
    assert!(create(&mem(data.clone(), "g.rom"), Attrs::NONE).is_none());
    assert!(create(&SharedFile::new(romkit::MemFile::new(data)), Attrs::NONE).is_none());
}

#[test]
fn test_footer_file_size_ceiling() {
    let d = Detector::new().with_config(DetectorConfig::new().footer_max_file_size(0x8000));
    assert!(d.create(&mem(wonderswan(false), "g.ws"), Attrs::NONE).is_none());
}

#[test]
fn test_attribute_filter() {
    let file = mem(gbs("Tune"), "t.gbs");
    assert!(create(&file, Attrs::HAS_METADATA).is_some());
    assert!(create(&file, Attrs::HAS_THUMBNAIL).is_none());

    let file = mem(smdh("Icon"), "icon.smdh");
    let h = create(&file, Attrs::HAS_THUMBNAIL | Attrs::HAS_METADATA).unwrap();
    assert!(h.supported_image_types().contains(ImageType::IntIcon));

    let file = mem(wonderswan(false), "g.ws");
    assert!(create(&file, Attrs::HAS_METADATA).is_none());
}

#[test]
fn test_detection_is_repeatable() {
    let file = mem(dmg("ZELDA"), "z.gb");
    let mut a = create(&file, Attrs::NONE).unwrap();
    let mut b = create(&file, Attrs::NONE).unwrap();
    assert_eq!(a.class_name(), b.class_name());
    assert_eq!(a.fields().unwrap(), b.fields().unwrap());
    // the caller's handle plus one per handler
    assert_eq!(file.handle_count(), 3);
    drop(a);
    b.close();
    assert_eq!(file.handle_count(), 1);
}

#[test]
fn test_xdbf_language_fallback() {
    let data = xdbf(&[
        (2, &[(0x8000, "タイトル")][..]),
        (1, &[(0x8000, "Title")][..]),
    ]);
    let d = Detector::new().with_settings(Settings::new().language(LC_DE));
    let mut h = d.create(&mem(data.clone(), "t.xdbf"), Attrs::NONE).unwrap();
    assert_eq!(h.metadata().unwrap().string(Property::Title), Some("Title"));

    let d = Detector::new().with_settings(Settings::new().language(LC_JA));
    let mut h = d.create(&mem(data, "t.xdbf"), Attrs::NONE).unwrap();
    assert_eq!(h.metadata().unwrap().string(Property::Title), Some("タイトル"));
}

#[test]
fn test_paired_save_from_either_file() {
    let dir = tempfile::tempdir().unwrap();
    let vms_path = dir.path().join("SAVE.VMS");
    let vmi_path = dir.path().join("SAVE.VMI");
    std::fs::write(&vms_path, vms("PAIRED")).unwrap();
    std::fs::write(&vmi_path, vmi("SAVE")).unwrap();

    for path in [&vms_path, &vmi_path] {
        let mut h = Detector::new().open_path(path, Attrs::NONE).unwrap();
        assert_eq!(h.class_name(), "DreamcastSave");
        let f = h.fields().unwrap();
        assert_eq!(f.string("VMS Description"), Some("PAIRED"));
        assert_eq!(f.string("VMI Description"), Some("Index"));
        assert_eq!(f.string("VMS Filename"), Some("SAVEFILE"));
    }

    // without pairing each file is read on its own
    let d = Detector::new().with_config(DetectorConfig::new().paired(false));
    let mut h = d.open_path(&vmi_path, Attrs::NONE).unwrap();
    assert!(h.fields().unwrap().find("VMS Description").is_none());
}

#[test]
fn test_paired_save_missing_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alone.vms");
    std::fs::write(&path, vms("ALONE")).unwrap();
    let mut h = Detector::new().open_path(&path, Attrs::NONE).unwrap();
    let f = h.fields().unwrap();
    assert_eq!(f.string("VMS Description"), Some("ALONE"));
    assert!(f.find("VMI Description").is_none());
}

#[test]
fn test_unsupported_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.bin");
    std::fs::write(&path, [0x11u8; 600]).unwrap();
    assert!(matches!(
        Detector::new().open_path(&path, Attrs::NONE),
        Err(romkit::Error::UnsupportedFormat)
    ));
}

#[test]
fn test_catalog_unions() {
    let exts = romkit::supported_extensions();
    assert!(std::ptr::eq(exts, romkit::supported_extensions()));
    for ext in [".xdbf", ".smdh", ".gb", ".gbs", ".vgm", ".vms", ".bnr", ".sid", ".tgc", ".ws"] {
        assert!(exts.iter().any(|e| e.ext == ext), "{ext} missing");
    }
    let mimes = romkit::supported_mime_types();
    assert!(mimes.contains(&"application/x-wonderswan-color-rom"));
}
