use image_view_texel::{AllocError, Buffer};

#[test]
fn conversions() {
    let mut buffer = Buffer::new(16);

    assert_eq!(buffer.as_texels::<u8>().len(), 16);
    assert_eq!(buffer.as_texels_mut::<u8>().len(), 16);
    assert_eq!(buffer.as_texels::<u16>().len(), 8);
    assert_eq!(buffer.as_texels_mut::<u16>().len(), 8);
    assert_eq!(buffer.as_texels::<[u32; 4]>(), &[[0u32; 4]][..]);
    assert_eq!(buffer.as_texels::<[f32; 4]>().len(), 1);

    buffer.as_texels_mut::<u16>()[0] = 0x1234;
    assert_eq!(&buffer.as_bytes()[..2], &0x1234u16.to_ne_bytes());
}

#[test]
fn partial_texels() {
    let buffer = Buffer::new(7);
    assert_eq!(buffer.as_bytes().len(), 7);
    assert_eq!(buffer.as_texels::<u16>().len(), 3);
    assert_eq!(buffer.as_texels::<u32>().len(), 1);
    assert!(buffer.capacity() >= 16);
}

#[test]
fn resize_clears_exposed_bytes() -> Result<(), AllocError> {
    let mut buffer = Buffer::try_new(20)?;
    buffer.as_bytes_mut().fill(0xff);

    buffer.try_resize(4)?;
    assert_eq!(buffer.as_bytes(), &[0xff; 4]);

    // Bytes hidden by the shrink come back as zero.
    buffer.try_resize(40)?;
    assert_eq!(&buffer.as_bytes()[..4], &[0xff; 4]);
    assert!(buffer.as_bytes()[4..].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn allocation_failure_is_reported() {
    let err = Buffer::try_new(usize::MAX).unwrap_err();
    assert_eq!(err.requested, usize::MAX);

    let mut buffer = Buffer::new(8);
    assert!(buffer.try_resize(usize::MAX).is_err());
    assert_eq!(buffer.len(), 8);
}
