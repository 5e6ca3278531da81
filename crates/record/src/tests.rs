use super::*;
use std::io::Cursor;

// -------------------- Helpers --------------------

fn roundtrip(rec: &Record) -> Record {
    let bytes = rec.encode();
    Record::decode(&mut Cursor::new(bytes)).unwrap()
}

// -------------------- Round-trips --------------------

#[test]
fn encode_decode_roundtrip() {
    let rec = Record::new(b"name", b"alice", 1_700_000_000).unwrap();
    assert_eq!(roundtrip(&rec), rec);
}

#[test]
fn tombstone_roundtrip() {
    let rec = Record::new_tombstone(b"gone", 42).unwrap();
    let back = roundtrip(&rec);
    assert!(back.tombstone);
    assert!(back.value.is_empty());
    assert_eq!(back.key, b"gone");
    assert_eq!(back.timestamp, 42);
}

#[test]
fn binary_key_and_value() {
    let key = vec![0x00u8, 0xFF, 0x80];
    let value = vec![0xDEu8, 0xAD, 0xBE, 0xEF];
    let rec = Record::new(&key, &value, -7).unwrap();
    let back = roundtrip(&rec);
    assert_eq!(back.key, key);
    assert_eq!(back.value, value);
    assert_eq!(back.timestamp, -7);
}

#[test]
fn empty_value_is_allowed() {
    let rec = Record::new(b"k", b"", 1).unwrap();
    let back = roundtrip(&rec);
    assert!(back.value.is_empty());
    assert!(!back.tombstone);
}

#[test]
fn large_value_roundtrip() {
    let value = vec![b'x'; 1_000_000];
    let rec = Record::new(b"big", &value, 5).unwrap();
    assert_eq!(roundtrip(&rec).value.len(), 1_000_000);
}

// -------------------- Geometry --------------------

#[test]
fn encoded_len_matches_bytes() {
    let rec = Record::new(b"key", b"value", 1).unwrap();
    assert_eq!(rec.encode().len() as u64, rec.encoded_len());
    assert_eq!(rec.encoded_len(), (HEADER_LEN + 3 + 5) as u64);
}

#[test]
fn value_offset_is_header_plus_key() {
    let rec = Record::new(b"abc", b"vvvv", 1).unwrap();
    assert_eq!(rec.value_offset(), (HEADER_LEN + 3) as u64);

    // The bytes at value_offset really are the value region.
    let bytes = rec.encode();
    let at = rec.value_offset() as usize;
    assert_eq!(&bytes[at..at + 4], b"vvvv");
}

#[test]
fn version_byte_leads_the_record() {
    let rec = Record::new(b"k", b"v", 1).unwrap();
    assert_eq!(rec.encode()[0], FORMAT_VERSION);
}

// -------------------- Validation --------------------

#[test]
fn empty_key_rejected() {
    assert!(matches!(
        Record::new(b"", b"v", 1),
        Err(RecordError::EmptyKey)
    ));
    assert!(matches!(
        Record::new_tombstone(b"", 1),
        Err(RecordError::EmptyKey)
    ));
}

// -------------------- Corruption detection --------------------

#[test]
fn flipped_body_byte_fails_integrity() {
    let rec = Record::new(b"key", b"value", 99).unwrap();
    let bytes = rec.encode();

    // Flip every byte of the CRC-covered region in turn; each flip must be
    // caught. (Flipping the CRC field itself is covered separately.)
    for i in 5..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0xFF;
        let result = Record::decode(&mut Cursor::new(tampered));
        assert!(
            matches!(result, Err(RecordError::Integrity) | Err(RecordError::Io(_))),
            "flip at byte {} was not detected",
            i
        );
    }
}

#[test]
fn flipped_crc_byte_fails_integrity() {
    let rec = Record::new(b"key", b"value", 99).unwrap();
    let mut bytes = rec.encode();
    bytes[2] ^= 0x01;
    assert!(matches!(
        Record::decode(&mut Cursor::new(bytes)),
        Err(RecordError::Integrity)
    ));
}

#[test]
fn unknown_version_rejected() {
    let rec = Record::new(b"k", b"v", 1).unwrap();
    let mut bytes = rec.encode();
    bytes[0] = 0x07;
    assert!(matches!(
        Record::decode(&mut Cursor::new(bytes)),
        Err(RecordError::Version(0x07))
    ));
}

#[test]
fn negative_key_len_rejected_before_allocation() {
    let rec = Record::new(b"k", b"v", 1).unwrap();
    let mut bytes = rec.encode();
    // key_len lives at offset 13..17; write -1.
    bytes[13..17].copy_from_slice(&(-1i32).to_le_bytes());
    assert!(matches!(
        Record::decode(&mut Cursor::new(bytes)),
        Err(RecordError::Integrity)
    ));
}

#[test]
fn truncated_header_is_unexpected_eof() {
    let rec = Record::new(b"k", b"v", 1).unwrap();
    let bytes = rec.encode();
    let result = Record::decode(&mut Cursor::new(&bytes[..HEADER_LEN - 3]));
    match result {
        Err(RecordError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected UnexpectedEof, got {:?}", other),
    }
}

#[test]
fn truncated_value_is_unexpected_eof() {
    let rec = Record::new(b"key", b"a longer value", 1).unwrap();
    let bytes = rec.encode();
    let result = Record::decode(&mut Cursor::new(&bytes[..bytes.len() - 4]));
    match result {
        Err(RecordError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected UnexpectedEof, got {:?}", other),
    }
}

// -------------------- Stream behavior --------------------

#[test]
fn decode_consumes_exactly_one_record() {
    let a = Record::new(b"a", b"1", 1).unwrap();
    let b = Record::new(b"bb", b"22", 2).unwrap();
    let mut stream = a.encode();
    stream.extend_from_slice(&b.encode());

    let mut cursor = Cursor::new(stream);
    assert_eq!(Record::decode(&mut cursor).unwrap(), a);
    assert_eq!(Record::decode(&mut cursor).unwrap(), b);
}
