use pretty_assertions::assert_eq;

use crate::{compound, from_binary, to_binary, written_size, Compound, Error, List, Value};

const ROOT_NAME: &str = "The root name‽";

fn example_compound() -> Compound {
    fn inner() -> Compound {
        compound! {
            "int" => i32::MIN,
            "long" => i64::MAX,
            "float" => 1e10_f32,
            "double" => f64::INFINITY,
        }
    }

    compound! {
        "byte" => 123_i8,
        "list_of_int" => List::Int(vec![3, -7, 5]),
        "list_of_string" => List::String(vec!["foo".into(), "bar".into(), "baz".into()]),
        "string" => "aé日\0",
        "compound" => inner(),
        "list_of_compound" => List::Compound(vec![inner(), inner()]),
        "int_array" => vec![5, -9, i32::MIN, 0, i32::MAX],
        "byte_array" => vec![0_i8, 2, 3],
        "long_array" => vec![123_i64, 456, 789],
        "empty_list" => List::End,
    }
}

fn encode(c: &Compound) -> Vec<u8> {
    let mut buf = vec![];
    to_binary(c, &mut buf, ROOT_NAME).unwrap();
    buf
}

#[test]
fn round_trip() {
    let compound = example_compound();
    let buf = encode(&compound);

    let mut slice = buf.as_slice();
    let (decoded, root_name) = from_binary(&mut slice).unwrap();

    assert!(slice.is_empty());
    assert_eq!(root_name, ROOT_NAME);
    assert_eq!(decoded, compound);
}

#[test]
fn check_written_size() {
    let c = example_compound();
    let buf = encode(&c);

    assert_eq!(written_size(&c, ROOT_NAME), buf.len());
}

#[test]
fn decodes_known_bytes() {
    let bytes = [10, 0, 0, 3, 0, 3, 105, 110, 116, 0, 0, 222, 173, 0];

    let (nbt, root_name) = from_binary(&mut bytes.as_slice()).unwrap();

    assert_eq!(nbt, compound! { "int" => 0xdead });
    assert_eq!(root_name, "");
}

#[test]
fn leaves_trailing_bytes() {
    let mut buf = encode(&compound! { "a" => 1_i8 });
    buf.extend_from_slice(&[1, 2, 3]);

    let mut slice = buf.as_slice();
    from_binary(&mut slice).unwrap();

    assert_eq!(slice, &[1, 2, 3]);
}

#[test]
fn every_truncation_fails_cleanly() {
    let buf = encode(&example_compound());

    for end in 0..buf.len() {
        let mut slice = &buf[..end];
        assert!(
            from_binary(&mut slice).is_err(),
            "truncation at {end} decoded successfully"
        );
    }
}

#[test]
fn root_must_be_compound() {
    // An int tag at the root.
    let bytes = [3, 0, 0, 0, 0, 0, 1];

    assert!(matches!(
        from_binary(&mut bytes.as_slice()),
        Err(Error::RootNotCompound(crate::Tag::Int))
    ));
}

#[test]
fn negative_array_length() {
    // Root compound containing a long array "a" of length -1.
    let bytes = [10, 0, 0, 12, 0, 1, b'a', 0xff, 0xff, 0xff, 0xff, 0];

    assert!(matches!(
        from_binary(&mut bytes.as_slice()),
        Err(Error::NegativeLength { len: -1, .. })
    ));
}

#[test]
fn huge_array_length_does_not_allocate() {
    // A byte array claiming i32::MAX elements with no payload.
    let bytes = [10, 0, 0, 7, 0, 1, b'a', 0x7f, 0xff, 0xff, 0xff];

    assert!(matches!(
        from_binary(&mut bytes.as_slice()),
        Err(Error::UnexpectedEof)
    ));
}

#[test]
fn end_list_must_be_empty() {
    let bytes = [10, 0, 0, 9, 0, 1, b'a', 0, 0, 0, 0, 2, 0];

    assert!(matches!(
        from_binary(&mut bytes.as_slice()),
        Err(Error::NonEmptyEndList(2))
    ));
}

#[test]
fn invalid_tag_id() {
    let bytes = [10, 0, 0, 42, 0, 1, b'a', 0];

    assert!(matches!(
        from_binary(&mut bytes.as_slice()),
        Err(Error::InvalidTag(42))
    ));
}

#[test]
fn invalid_string() {
    // A lone continuation byte is not valid modified UTF-8.
    let bytes = [10, 0, 0, 8, 0, 1, b'a', 0, 1, 0x80, 0];

    assert!(matches!(
        from_binary(&mut bytes.as_slice()),
        Err(Error::InvalidString)
    ));
}

#[test]
fn deeply_nested_compound_decode() {
    let mut c = compound!("" => 111_i8);
    for _ in 0..1000 {
        c = compound!("" => c);
    }

    let buf = encode(&c);

    assert!(matches!(
        from_binary(&mut buf.as_slice()),
        Err(Error::DepthLimit)
    ));
}

#[test]
fn deeply_nested_list_decode() {
    // Bypass the encoder so the nesting is not limited by stack size there.
    let mut buf = vec![10, 0, 0, 9, 0, 0];
    for _ in 0..1000 {
        buf.extend_from_slice(&[9, 0, 0, 0, 1]);
    }

    assert!(matches!(
        from_binary(&mut buf.as_slice()),
        Err(Error::DepthLimit)
    ));
}

#[test]
fn nesting_below_the_limit_is_accepted() {
    let mut c = compound!("" => 1_i8);
    for _ in 0..100 {
        c = compound!("" => c);
    }

    let buf = encode(&c);
    let (decoded, _) = from_binary(&mut buf.as_slice()).unwrap();

    assert_eq!(decoded, c);
}

#[test]
fn empty_list_of_any_type_reads_as_compounds() {
    let c = compound! { "l" => List::Int(vec![]) };
    let buf = encode(&c);
    let (decoded, _) = from_binary(&mut buf.as_slice()).unwrap();

    let Some(Value::List(list)) = decoded.get("l") else {
        panic!("missing list");
    };
    assert_eq!(list.as_compounds(), Some([].as_slice()));
}
