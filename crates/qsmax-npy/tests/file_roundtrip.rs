use proptest::prelude::*;
use qsmax_npy::{read_npy, write_npy, ArrayF32, NpyError};

#[test]
fn writes_and_reads_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input_0.npy");
    let array = ArrayF32::new(vec![1, 12, 32, 4], (0..1536).map(|i| (i % 17) as f32).collect())
        .unwrap();
    write_npy(&path, &array).unwrap();
    assert_eq!(read_npy(&path).unwrap(), array);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_npy(&dir.path().join("output.npy")).unwrap_err();
    assert!(matches!(err, NpyError::Io(_)));
}

proptest! {
    /// Any shape with up to four small dimensions survives the header.
    #[test]
    fn header_preserves_shape(shape in prop::collection::vec(1usize..6, 0..5)) {
        let n: usize = shape.iter().product();
        let array = ArrayF32::new(shape.clone(), vec![0.5; n]).unwrap();
        let mut buf = Vec::new();
        array.write_to(&mut buf).unwrap();
        let back = ArrayF32::read_from(&mut buf.as_slice()).unwrap();
        prop_assert_eq!(back.shape(), shape.as_slice());
    }
}
