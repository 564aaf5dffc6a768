use spiroc::{
    bitstream::Bitstream,
    core::ChipKind,
    decode::{
        decode,
        FieldValue,
    },
    settings::builtin_layout,
    xml::{
        AcqConfig,
        CalibDoc,
    },
};
use std::path::{
    Path,
    PathBuf,
};

fn write_config(dir: &Path, bitstream: &Bitstream) -> PathBuf {
    let doc = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ecal>
  <domain name="wagasci">
    <acqpc name="acqpc">
      <gdcc name="gdcc_1_1">
        <dif name="dif_1_1_1">
          <asu name="asu_1_1_1_1">
            <param name="spiroc2d_enable_preamp_chans">0-1-2-3</param>
            <param name="spiroc2d_enable_chip">1</param>
            <spiroc2d name="spiroc2d">
              <param name="spiroc2d_bitstream">{}</param>
            </spiroc2d>
          </asu>
        </dif>
      </gdcc>
    </acqpc>
  </domain>
</ecal>
"#,
        bitstream.to_xml_text().unwrap()
    );
    let path = dir.join("config.xml");
    std::fs::write(&path, doc).unwrap();
    path
}

fn defaults() -> Bitstream {
    let layout = builtin_layout(ChipKind::Spiroc2d).unwrap();
    Bitstream::from_defaults(ChipKind::Spiroc2d, &layout).unwrap()
}

#[test]
fn test_param_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &defaults());
    let mut config = AcqConfig::open(&path).unwrap();
    assert_eq!(config.set_param("spiroc2d_enable_chip", -7), 1);
    let out = dir.path().join("out.xml");
    config.write(&out).unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("<?xml"));
    let reread = AcqConfig::open(&out).unwrap();
    assert_eq!(
        reread.param(1, 1, 1, "spiroc2d_enable_chip").unwrap(),
        "-7"
    );
    assert_eq!(reread.bitstream(1, 1, 0).unwrap(), defaults());
}

#[test]
fn test_save_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &defaults());
    let mut config = AcqConfig::open(&path).unwrap();
    let mut bitstream = config.bitstream(1, 1, 0).unwrap();
    bitstream.set_trigth(180).unwrap();
    config.set_bitstream(1, 1, 0, &bitstream).unwrap();
    config.save().unwrap();
    let reread = AcqConfig::open(&path).unwrap();
    assert_eq!(reread.chip_config(1, 1, 0, 1).unwrap()[0][0], 180);
}

#[test]
fn test_wrong_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.txt");
    std::fs::write(&path, "<ecal/>").unwrap();
    assert!(AcqConfig::open(&path).is_err());
    assert!(CalibDoc::open(&path).is_err());
}

#[test]
fn test_defaults_decode_to_layout() {
    let layout = builtin_layout(ChipKind::Spiroc2d).unwrap();
    let decoded = decode(&defaults(), &layout).unwrap();
    let delay = decoded
        .iter()
        .find(|f| f.name.as_str() == "delay_trigger")
        .unwrap();
    assert_eq!(delay.value, FieldValue::Whole("00010100".to_owned()));
}

#[test]
fn test_fill_calibration_document() {
    let dir = tempfile::tempdir().unwrap();
    let mut bitstream = defaults();
    bitstream.set_input_dac(9, 37).unwrap();
    bitstream.set_amp_dac(9, 63).unwrap();
    let config = AcqConfig::open(write_config(dir.path(), &bitstream)).unwrap();

    let calib = dir.path().join("calib.xml");
    CalibDoc::make(0, 9, 4).write(&calib).unwrap();

    let layout = builtin_layout(ChipKind::Spiroc2d).unwrap();
    let mut doc = CalibDoc::open(&calib).unwrap();
    doc.fill_from_bitstream(&config.bitstream(1, 1, 0).unwrap(), &layout, 0, 9)
        .unwrap();
    doc.write(&calib).unwrap();

    let doc = CalibDoc::open(&calib).unwrap();
    assert_eq!(doc.config_value("inputDAC").unwrap(), 37);
    assert_eq!(doc.config_value("HG").unwrap(), 63);
    assert_eq!(doc.config_value("LG").unwrap(), 63);
    assert_eq!(doc.config_value("trigth").unwrap(), 250);
    assert_eq!(doc.config_value("start_time").unwrap(), 0);
}
