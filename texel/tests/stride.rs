use image_view_texel::{StrideLayout, StrideSpec};

#[test]
fn padded_rows_exclude_padding() {
    let layout = StrideLayout::new(StrideSpec {
        width: 3,
        height: 4,
        element_size: 2,
        row_stride: 8,
    })
    .unwrap();

    assert_eq!(layout.byte_len(), 32);
    assert_eq!(layout.row_len(), 6);
    assert!(!layout.is_packed());
    assert_eq!(layout.row(0), 0..6);
    assert_eq!(layout.row(3), 24..30);
    assert_eq!(layout.element(2, 1), Some(12..14));
    assert_eq!(layout.element(3, 1), None);
    assert_eq!(layout.element(0, 4), None);
}

#[test]
fn rejects_short_stride() {
    let err = StrideLayout::new(StrideSpec {
        width: 4,
        height: 1,
        element_size: 3,
        row_stride: 11,
    })
    .unwrap_err();
    assert!(!err.is_out_of_memory());
}

#[test]
fn rejects_overflow() {
    let err = StrideLayout::new(StrideSpec {
        width: usize::MAX / 2,
        height: 1,
        element_size: 4,
        row_stride: usize::MAX,
    })
    .unwrap_err();
    assert!(err.is_out_of_memory());

    let err = StrideLayout::new(StrideSpec {
        width: 1,
        height: usize::MAX,
        element_size: 1,
        row_stride: 2,
    })
    .unwrap_err();
    assert!(err.is_out_of_memory());
}

#[test]
fn empty_layouts() {
    let layout = StrideLayout::new(StrideSpec::packed(0, 10, 4).unwrap()).unwrap();
    assert_eq!(layout.byte_len(), 0);
    assert!(layout.is_packed());
}
