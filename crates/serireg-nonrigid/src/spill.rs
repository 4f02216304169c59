//! `.srdf` displacement spill format (§12.3): a region-restricted two-band
//! float32 array plus the bbox/full-shape metadata needed to zero-pad it
//! back to the canonical frame on load. Stands in for spec.md's "two-band
//! floating-point tiled TIFF" since TIFF encoding is out of scope (§11.4).

use std::io::{Read, Seek, Write};

use binrw::{BinRead, BinWrite};
use serireg_warp::{BboxXywh, DisplacementField, ShapeRc};

const FORMAT_VERSION: u16 = 1;

#[derive(BinRead, BinWrite, Debug)]
#[brw(little, magic = b"SRDF")]
struct SrdfHeader {
    version: u16,
    full_rows: u32,
    full_cols: u32,
    bbox_x: u32,
    bbox_y: u32,
    bbox_w: u32,
    bbox_h: u32,
}

pub fn write_srdf<W: Write + Seek>(writer: &mut W, field: &DisplacementField) -> anyhow::Result<()> {
    let bbox = field.bbox();
    let (full_rows, full_cols) = field.full_shape();
    let header = SrdfHeader {
        version: FORMAT_VERSION,
        full_rows: full_rows as u32,
        full_cols: full_cols as u32,
        bbox_x: bbox.x,
        bbox_y: bbox.y,
        bbox_w: bbox.w,
        bbox_h: bbox.h,
    };
    header.write(writer)?;
    let dense = field.to_dense();
    for band in 0..2 {
        for r in bbox.y as usize..(bbox.y + bbox.h) as usize {
            for c in bbox.x as usize..(bbox.x + bbox.w) as usize {
                writer.write_all(&dense[[band, r, c]].to_le_bytes())?;
            }
        }
    }
    Ok(())
}

pub fn read_srdf<R: Read + Seek>(reader: &mut R) -> anyhow::Result<DisplacementField> {
    let header = SrdfHeader::read(reader)?;
    anyhow::ensure!(header.version == FORMAT_VERSION, "unsupported .srdf version {}", header.version);
    let full_shape: ShapeRc = (header.full_rows as usize, header.full_cols as usize);
    let bbox = BboxXywh { x: header.bbox_x, y: header.bbox_y, w: header.bbox_w, h: header.bbox_h };
    let mut data = ndarray::Array3::<f32>::zeros((2, bbox.h as usize, bbox.w as usize));
    for band in 0..2 {
        for r in 0..bbox.h as usize {
            for c in 0..bbox.w as usize {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf)?;
                data[[band, r, c]] = f32::from_le_bytes(buf);
            }
        }
    }
    DisplacementField::from_region(data, bbox, full_shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_bbox_restricted_field() {
        let full_shape = (20, 20);
        let bbox = BboxXywh { x: 2, y: 3, w: 6, h: 5 };
        let mut data = ndarray::Array3::<f32>::zeros((2, bbox.h as usize, bbox.w as usize));
        data[[0, 1, 1]] = 3.5;
        data[[1, 2, 2]] = -1.25;
        let field = DisplacementField::from_region(data, bbox, full_shape).unwrap();

        let mut buf = Cursor::new(Vec::new());
        write_srdf(&mut buf, &field).unwrap();
        buf.set_position(0);
        let loaded = read_srdf(&mut buf).unwrap();

        assert_eq!(loaded.full_shape(), full_shape);
        assert_eq!(loaded.bbox(), bbox);
        let original_dense = field.to_dense();
        let loaded_dense = loaded.to_dense();
        assert_eq!(original_dense, loaded_dense);
    }
}
