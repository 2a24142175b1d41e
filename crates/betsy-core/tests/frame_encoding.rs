//! Integration tests for the betsy-core frame path.
//!
//! These tests run a source image through layout, color conversion, chunking
//! and command encoding via the public API, then decode the resulting
//! datagrams and check that a tile would reassemble exactly what was
//! converted.

use betsy_core::{
    chunk_count, chunks, decode_command, scoped_address, upload_command, ColorSettings, Command,
    Display, PixelConverter, RgbaFrame, Tile, TileGeometry,
};
use betsy_core::protocol::FRAME_CHUNK_SIZE;

fn tile(n: u16) -> Tile {
    Tile::new(scoped_address(&format!("fe80::{n:x}"), 1, 48757).expect("valid test address"))
}

/// Converts one tile crop and encodes it into data-command datagrams.
fn encode_tile(image: &RgbaFrame, display: &Display, index: usize, buffer: u8) -> (Vec<u8>, Vec<Vec<u8>>) {
    let settings = ColorSettings::default();
    let mapped = display.mapping()[index];
    let mut frame = vec![0u8; display.geometry().frame_len()];
    PixelConverter::new(&settings)
        .convert_crop(image, mapped.crop, &mut frame)
        .expect("frame buffer sized from geometry");

    let datagrams = chunks(&frame, FRAME_CHUNK_SIZE)
        .map(|c| {
            Command::Data {
                buffer,
                offset: c.offset,
                payload: c.bytes,
            }
            .to_bytes()
        })
        .collect();
    (frame, datagrams)
}

#[test]
fn test_white_tile_reassembles_to_full_scale() {
    // Arrange
    let mut display = Display::new(TileGeometry::BETSY);
    display.map_tile(tile(1), 0, 0);
    let image = RgbaFrame::solid(18, 18, [255, 255, 255, 255]);

    // Act
    let (_, datagrams) = encode_tile(&image, &display, 0, 0);

    // Assert – reassemble as a tile would
    let mut device = vec![0u8; 1944];
    for datagram in &datagrams {
        match decode_command(datagram).expect("well-formed datagram") {
            Command::Data {
                buffer,
                offset,
                payload,
            } => {
                assert_eq!(buffer, 0);
                device[offset..offset + payload.len()].copy_from_slice(payload);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
    assert_eq!(datagrams.len(), chunk_count(1944, FRAME_CHUNK_SIZE));
    assert!(device
        .chunks_exact(2)
        .all(|w| u16::from_le_bytes([w[0], w[1]]) == 0x0FFF));
}

#[test]
fn test_black_tile_is_all_zero() {
    let mut display = Display::new(TileGeometry::BETSY);
    display.map_tile(tile(1), 0, 0);
    let image = RgbaFrame::solid(18, 18, [0, 0, 0, 255]);

    let (frame, _) = encode_tile(&image, &display, 0, 0);

    assert!(frame.iter().all(|&b| b == 0));
}

#[test]
fn test_sorted_display_crops_follow_row_major_order() {
    // Arrange – left half black, right half white
    let mut image = RgbaFrame::solid(36, 18, [0, 0, 0, 255]);
    for y in 0..18 {
        for x in 18..36 {
            image.put(x, y, [255, 255, 255, 255]);
        }
    }
    let mut display = Display::new(TileGeometry::BETSY);
    display.map_tile(tile(2), 18, 0);
    display.map_tile(tile(1), 0, 0);

    // Act
    display.sort();
    let (left, _) = encode_tile(&image, &display, 0, 1);
    let (right, _) = encode_tile(&image, &display, 1, 1);

    // Assert
    assert_eq!(display.mapping()[0].tile, tile(1));
    assert!(left.iter().all(|&b| b == 0));
    assert!(right.chunks_exact(2).all(|w| w == [0xFF, 0x0F]));
}

#[test]
fn test_present_command_decodes_to_upload() {
    let text = upload_command(1);

    assert_eq!(decode_command(text.as_bytes()), Ok(Command::Upload { buffer: 1 }));
}
