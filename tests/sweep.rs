//! End-to-end tests: raw image on disk to formatted listing.

use msp430_analyzer::formatter::{HumanFormatter, JsonFormatter, ListingFormatter, ShortFormatter};
use msp430_analyzer::{disassemble_file, CodeRef, DataRef, Opcode, Register, SweepOptions};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;

fn words(ws: &[u16]) -> Vec<u8> {
    ws.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn image_file(ws: &[u16]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&words(ws)).unwrap();
    file.flush().unwrap();
    file
}

fn options() -> SweepOptions {
    SweepOptions::new().with_base(0xC000)
}

#[test]
fn test_function_listing() {
    // push R11 / mov #5A80h, &120h / mov 2(SP), R12 / pop R11 / ret
    let file = image_file(&[0x120B, 0x40B2, 0x5A80, 0x0120, 0x411C, 0x0002, 0x413B, 0x4130]);
    let listing = disassemble_file(file.path(), &options()).unwrap();

    let text = HumanFormatter::quiet().format_listing(&listing, file.path());
    assert_eq!(
        text,
        "push.w  R11\n\
         mov.w   #5A80h, &120h\n\
         mov.w   2(SP), R12\n\
         pop     R11\n\
         ret\n"
    );

    let db = &listing.database;
    assert!(db.has_data_ref(0xC002, 0x0120, DataRef::Write));
    assert!(db.has_code_ref(0xC00C, 0xC00E, CodeRef::Fallthrough));
    assert_eq!(db.stack_point(0xC002), Some(-2));
    assert_eq!(db.stack_point(0xC00E), Some(2));
    assert_eq!(db.sp_offset_at(0xC008), Some(-2));
    assert!(db.recomputed(0xC00E));
}

#[test]
fn test_jump_table() {
    // cmp #5, R5 / jc +8 / rla R5 / br 0C100h(R5) / nop x4 / ret
    let file = image_file(&[
        0x9035, 0x0005, 0x2C04, 0x5505, 0x4510, 0xC100, 0x4303, 0x4303, 0x4303, 0x4303, 0x4130,
    ]);
    let listing = disassemble_file(file.path(), &options()).unwrap();

    let info = listing.database.switch_at(0xC008).unwrap();
    assert_eq!(info.jumps, 0xC100);
    assert_eq!(info.ncases, 5);
    assert_eq!(info.index_register, Register::R5);
    assert_eq!(info.default_target, 0xC00E);

    let short = ShortFormatter::new().format_listing(&listing, Path::new("fw.bin"));
    assert_eq!(short, "fw.bin\t0C000\t9\t1\t0\n");

    let human = HumanFormatter::new().format_listing(&listing, Path::new("fw.bin"));
    assert!(human.contains("Switches:"));
    assert!(human.contains("table 0C100, 5 cases on R5, default 0C00E"));
}

#[test]
fn test_json_round_trips_through_serde() {
    let file = image_file(&[0x12B0, 0xC100, 0x1310, 0x4130]);
    let listing = disassemble_file(file.path(), &options()).unwrap();
    let out = JsonFormatter::new().format_listing(&listing, file.path());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(value["lines"].as_array().unwrap().len(), 3);
    assert_eq!(value["lines"][1]["insn"], serde_json::Value::Null);
    assert_eq!(value["problems"][0]["kind"], "undecodable");
    assert!(value["code_refs"]
        .as_array()
        .unwrap()
        .iter()
        .any(|x| x["kind"] == "call_target" && x["to"] == 0xC100));
}

#[test]
fn test_canonical_decoder() {
    let bytes = words(&[0x4130, 0x4303]);
    let listing = msp430_analyzer::sweep::sweep_with(
        &msp430_analyzer::Decoder::canonical(),
        &bytes,
        &options(),
    );
    let ops: Vec<_> = listing.instructions().map(|i| i.opcode).collect();
    assert_eq!(ops, [Opcode::Mov, Opcode::Mov]);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = disassemble_file(dir.path().join("absent.bin"), &options()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
