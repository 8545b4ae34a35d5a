use super::*;

#[test]
fn test_cbor_bytes() {
    let data = into_cbor_bytes(0x1234_u64).unwrap();
    let (val, n): (u64, usize) = from_cbor_bytes(&data).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(val, 0x1234);

    let data = into_cbor_bytes("hello world".to_string()).unwrap();
    let (val, n): (String, usize) = from_cbor_bytes(&data).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(val, "hello world".to_string());

    let res: Result<(u64, usize)> = from_cbor_bytes(&[0xff, 0xff, 0xff]);
    assert!(res.is_err());
}
