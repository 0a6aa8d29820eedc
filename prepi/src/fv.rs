//! fv.rs — Firmware-volume walking and next-phase chaining
//!
//! The flashed firmware device holds an outer volume whose only interesting
//! file is a compressed inner volume; the inner volume holds the next-phase
//! core. This module walks that container: header validation, file and
//! section iteration, inflate into a caller-provided scratch region, and
//! PE entry-point resolution for the execute-in-place core image.
//!
//! Parsing discipline follows the rest of the crate: headers are read with
//! `read_unaligned`, every offset/length is bounds-checked against the
//! enclosing buffer before use, and a malformed structure is an error, never
//! a wild read.

use core::mem::size_of;
use core::ptr;

use miniz_oxide::inflate::core::{decompress, inflate_flags, DecompressorOxide};
use miniz_oxide::inflate::TINFLStatus;
use r_efi::efi::Guid;

use crate::error::BootError;

/// Volume signature, "_FVH" little-endian.
pub const FV_SIGNATURE: u32 = u32::from_le_bytes(*b"_FVH");

pub const FILE_TYPE_DXE_CORE: u8 = 0x05;
pub const FILE_TYPE_FV_IMAGE: u8 = 0x0B;
pub const FILE_TYPE_PAD: u8 = 0xF0;

pub const SECTION_COMPRESSION: u8 = 0x01;
pub const SECTION_PE32: u8 = 0x10;
pub const SECTION_FV_IMAGE: u8 = 0x17;

pub const COMPRESSION_NONE: u8 = 0x00;
pub const COMPRESSION_STANDARD: u8 = 0x01;

/// On-flash volume header. Block map entries follow; `header_length` covers
/// them. Fields beyond the validated trio exist to keep the on-flash layout
/// honest.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
struct VolumeHeader {
    zero_vector: [u8; 16],
    filesystem_guid: Guid,
    fv_length: u64,
    signature: u32,
    attributes: u32,
    header_length: u16,
    checksum: u16,
    ext_header_offset: u16,
    reserved: u8,
    revision: u8,
}

/// On-flash file header: 16-byte name, integrity word, type, attributes,
/// 24-bit length (header included), state byte.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
struct FileHeader {
    name: [u8; 16],
    integrity_check: u16,
    file_type: u8,
    attributes: u8,
    size: [u8; 3],
    state: u8,
}

const FILE_HEADER_LEN: usize = size_of::<FileHeader>();
const SECTION_HEADER_LEN: usize = 4;

fn len24(size: [u8; 3]) -> usize {
    u32::from_le_bytes([size[0], size[1], size[2], 0]) as usize
}

/// Validated view over a firmware volume.
pub struct FirmwareVolume<'a> {
    bytes: &'a [u8],
    header_length: usize,
}

impl<'a> FirmwareVolume<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, BootError> {
        if bytes.len() < size_of::<VolumeHeader>() {
            return Err(BootError::FvCorrupt);
        }
        // SAFETY: length checked; the header may sit unaligned in the image.
        let header: VolumeHeader = unsafe { ptr::read_unaligned(bytes.as_ptr() as *const _) };

        if header.signature != FV_SIGNATURE {
            return Err(BootError::FvCorrupt);
        }
        let fv_length = header.fv_length as usize;
        let header_length = header.header_length as usize;
        if header_length < size_of::<VolumeHeader>()
            || fv_length < header_length
            || fv_length > bytes.len()
        {
            return Err(BootError::FvCorrupt);
        }

        Ok(Self { bytes: &bytes[..fv_length], header_length })
    }

    /// Iterate the volume's files. Files are 8-byte aligned relative to the
    /// volume start; free space (an all-ones name) ends the walk.
    pub fn files(&self) -> FileWalker<'a> {
        FileWalker { bytes: self.bytes, offset: self.header_length }
    }

    pub fn file_of_type(&self, file_type: u8) -> Option<FfsFile<'a>> {
        self.files().find(|f| f.file_type == file_type)
    }
}

/// One file: its type and its section stream.
#[derive(Debug, Clone, Copy)]
pub struct FfsFile<'a> {
    pub file_type: u8,
    pub data: &'a [u8],
}

impl<'a> FfsFile<'a> {
    /// Iterate the file's sections (4-byte aligned within the stream).
    pub fn sections(&self) -> SectionWalker<'a> {
        SectionWalker { bytes: self.data, offset: 0 }
    }

    pub fn section_of_type(&self, section_type: u8) -> Option<Section<'a>> {
        self.sections().find(|s| s.section_type == section_type)
    }
}

pub struct FileWalker<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for FileWalker<'a> {
    type Item = FfsFile<'a>;

    fn next(&mut self) -> Option<FfsFile<'a>> {
        loop {
            // Files are 8-byte aligned within the volume.
            self.offset = (self.offset + 7) & !7;
            let rest = self.bytes.get(self.offset..)?;
            if rest.len() < FILE_HEADER_LEN {
                return None;
            }
            // SAFETY: length checked above.
            let header: FileHeader = unsafe { ptr::read_unaligned(rest.as_ptr() as *const _) };

            // Erased flash: no more files.
            if header.name == [0xFF; 16] {
                return None;
            }
            let total = len24(header.size);
            if total < FILE_HEADER_LEN || total > rest.len() {
                return None;
            }

            self.offset += total;
            if header.file_type == FILE_TYPE_PAD {
                continue;
            }
            return Some(FfsFile {
                file_type: header.file_type,
                data: &rest[FILE_HEADER_LEN..total],
            });
        }
    }
}

/// One section: its type and payload (header stripped).
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub section_type: u8,
    pub data: &'a [u8],
}

pub struct SectionWalker<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for SectionWalker<'a> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Section<'a>> {
        // Sections are 4-byte aligned within the stream.
        self.offset = (self.offset + 3) & !3;
        let rest = self.bytes.get(self.offset..)?;
        if rest.len() < SECTION_HEADER_LEN {
            return None;
        }
        let total = len24([rest[0], rest[1], rest[2]]);
        if total < SECTION_HEADER_LEN || total > rest.len() {
            return None;
        }
        self.offset += total;
        Some(Section { section_type: rest[3], data: &rest[SECTION_HEADER_LEN..total] })
    }
}

/// Compression section payload prefix.
#[derive(Debug, Clone, Copy)]
struct CompressionInfo {
    uncompressed_length: u32,
    compression_type: u8,
}

const COMPRESSION_INFO_LEN: usize = 5;

fn compression_info<'a>(section: &Section<'a>) -> Result<(CompressionInfo, &'a [u8]), BootError> {
    if section.data.len() < COMPRESSION_INFO_LEN {
        return Err(BootError::FvCorrupt);
    }
    let d = section.data;
    let info = CompressionInfo {
        uncompressed_length: u32::from_le_bytes([d[0], d[1], d[2], d[3]]),
        compression_type: d[4],
    };
    Ok((info, &section.data[COMPRESSION_INFO_LEN..]))
}

fn fv_image_compression_section<'a>(
    outer: &FirmwareVolume<'a>,
) -> Result<Section<'a>, BootError> {
    let file = outer
        .file_of_type(FILE_TYPE_FV_IMAGE)
        .ok_or(BootError::FvImageNotFound)?;
    file.section_of_type(SECTION_COMPRESSION)
        .ok_or(BootError::SectionNotFound)
}

/// Bytes the decompressed inner volume will occupy, for sizing the scratch
/// allocation before inflating.
pub fn fv_image_uncompressed_size(outer: &FirmwareVolume<'_>) -> Result<u32, BootError> {
    let section = fv_image_compression_section(outer)?;
    let (info, _) = compression_info(&section)?;
    Ok(info.uncompressed_length)
}

/// Decompress the inner volume into `scratch`. Returns the byte count
/// written, which must equal the section's declared uncompressed length.
pub fn decompress_fv_image(
    outer: &FirmwareVolume<'_>,
    scratch: &mut [u8],
) -> Result<usize, BootError> {
    let section = fv_image_compression_section(outer)?;
    let (info, payload) = compression_info(&section)?;
    let expected = info.uncompressed_length as usize;
    if expected > scratch.len() {
        return Err(BootError::DecompressFailed);
    }

    match info.compression_type {
        COMPRESSION_NONE => {
            if payload.len() < expected {
                return Err(BootError::DecompressFailed);
            }
            scratch[..expected].copy_from_slice(&payload[..expected]);
            Ok(expected)
        }
        COMPRESSION_STANDARD => {
            let mut state = DecompressorOxide::new();
            let (status, _consumed, written) = decompress(
                &mut state,
                payload,
                scratch,
                0,
                inflate_flags::TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF,
            );
            if status != TINFLStatus::Done || written != expected {
                return Err(BootError::DecompressFailed);
            }
            Ok(written)
        }
        _ => Err(BootError::DecompressFailed),
    }
}

// PE/COFF offsets for entry resolution.
const DOS_MAGIC: u16 = 0x5A4D; // "MZ"
const PE_MAGIC: u32 = 0x0000_4550; // "PE\0\0"
const DOS_LFANEW_OFFSET: usize = 0x3C;
const OPT_HEADER_OFFSET: usize = 24; // after PE signature + COFF header
const ENTRY_RVA_OFFSET: usize = 16; // within the optional header
const OPT_MAGIC_PE32: u16 = 0x010B;
const OPT_MAGIC_PE32_PLUS: u16 = 0x020B;

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, BootError> {
    let b = bytes.get(offset..offset + 2).ok_or(BootError::BadPeImage)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, BootError> {
    let b = bytes.get(offset..offset + 4).ok_or(BootError::BadPeImage)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Entry-point RVA of a PE image. The next-phase core is built
/// execute-in-place, so the RVA offsets directly from the placed image base.
pub fn pe_entry_rva(image: &[u8]) -> Result<u32, BootError> {
    if read_u16(image, 0)? != DOS_MAGIC {
        return Err(BootError::BadPeImage);
    }
    let lfanew = read_u32(image, DOS_LFANEW_OFFSET)? as usize;
    if read_u32(image, lfanew)? != PE_MAGIC {
        return Err(BootError::BadPeImage);
    }
    let opt = lfanew + OPT_HEADER_OFFSET;
    let magic = read_u16(image, opt)?;
    if magic != OPT_MAGIC_PE32 && magic != OPT_MAGIC_PE32_PLUS {
        return Err(BootError::BadPeImage);
    }
    read_u32(image, opt + ENTRY_RVA_OFFSET)
}

/// Locate the next-phase core in the inner volume and resolve its entry
/// address. `load_base` is the physical address `inner` sits at.
pub fn find_core_entry(inner: &[u8], load_base: u64) -> Result<u64, BootError> {
    let fv = FirmwareVolume::parse(inner)?;
    let core = fv.file_of_type(FILE_TYPE_DXE_CORE).ok_or(BootError::CoreNotFound)?;
    let pe = core.section_of_type(SECTION_PE32).ok_or(BootError::SectionNotFound)?;

    let rva = pe_entry_rva(pe.data)?;
    // Section payload offset within the inner volume.
    let image_offset = pe.data.as_ptr() as u64 - inner.as_ptr() as u64;
    Ok(load_base + image_offset + rva as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal image assembly, mirroring the flash layout the build pipeline
    // emits.

    fn push_section(out: &mut Vec<u8>, section_type: u8, payload: &[u8]) -> usize {
        while out.len() % 4 != 0 {
            out.push(0);
        }
        let start = out.len();
        let total = (SECTION_HEADER_LEN + payload.len()) as u32;
        out.extend_from_slice(&total.to_le_bytes()[..3]);
        out.push(section_type);
        out.extend_from_slice(payload);
        start
    }

    fn push_file(out: &mut Vec<u8>, file_type: u8, sections: &[u8]) {
        while out.len() % 8 != 0 {
            out.push(0);
        }
        let total = (FILE_HEADER_LEN + sections.len()) as u32;
        out.extend_from_slice(&[0x11; 16]); // name
        out.extend_from_slice(&0u16.to_le_bytes()); // integrity
        out.push(file_type);
        out.push(0); // attributes
        out.extend_from_slice(&total.to_le_bytes()[..3]);
        out.push(0xF8); // state
        out.extend_from_slice(sections);
    }

    fn finish_volume(files: &[u8]) -> Vec<u8> {
        let header_len = 72u16; // 56-byte header + two block-map pairs
        let mut fv = Vec::new();
        fv.extend_from_slice(&[0u8; 16]); // zero vector
        fv.extend_from_slice(&[0x22; 16]); // filesystem guid
        let total = header_len as usize + files.len();
        fv.extend_from_slice(&(total as u64).to_le_bytes());
        fv.extend_from_slice(&FV_SIGNATURE.to_le_bytes());
        fv.extend_from_slice(&0x0004_FEFFu32.to_le_bytes()); // attributes
        fv.extend_from_slice(&header_len.to_le_bytes());
        fv.extend_from_slice(&0u16.to_le_bytes()); // checksum
        fv.extend_from_slice(&0u16.to_le_bytes()); // ext header
        fv.push(0);
        fv.push(2); // revision
        // Block map: one entry + terminator.
        fv.extend_from_slice(&1u32.to_le_bytes());
        fv.extend_from_slice(&(total as u32).to_le_bytes());
        fv.extend_from_slice(&0u32.to_le_bytes());
        fv.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(fv.len(), header_len as usize);
        fv.extend_from_slice(files);
        fv
    }

    fn minimal_pe(entry_rva: u32) -> Vec<u8> {
        let lfanew = 0x40u32;
        let mut pe = vec![0u8; 0x80];
        pe[0] = 0x4D; // M
        pe[1] = 0x5A; // Z
        pe[DOS_LFANEW_OFFSET..DOS_LFANEW_OFFSET + 4].copy_from_slice(&lfanew.to_le_bytes());
        let l = lfanew as usize;
        pe[l..l + 4].copy_from_slice(&PE_MAGIC.to_le_bytes());
        let opt = l + OPT_HEADER_OFFSET;
        pe[opt..opt + 2].copy_from_slice(&OPT_MAGIC_PE32_PLUS.to_le_bytes());
        pe[opt + ENTRY_RVA_OFFSET..opt + ENTRY_RVA_OFFSET + 4]
            .copy_from_slice(&entry_rva.to_le_bytes());
        pe
    }

    fn inner_volume(entry_rva: u32) -> Vec<u8> {
        let mut sections = Vec::new();
        push_section(&mut sections, SECTION_PE32, &minimal_pe(entry_rva));
        let mut files = Vec::new();
        push_file(&mut files, FILE_TYPE_DXE_CORE, &sections);
        finish_volume(&files)
    }

    fn outer_volume(inner: &[u8], compression_type: u8) -> Vec<u8> {
        let body: Vec<u8> = match compression_type {
            COMPRESSION_NONE => inner.to_vec(),
            COMPRESSION_STANDARD => miniz_oxide::deflate::compress_to_vec(inner, 8),
            _ => unreachable!(),
        };
        let mut payload = Vec::new();
        payload.extend_from_slice(&(inner.len() as u32).to_le_bytes());
        payload.push(compression_type);
        payload.extend_from_slice(&body);

        let mut sections = Vec::new();
        push_section(&mut sections, SECTION_COMPRESSION, &payload);
        let mut files = Vec::new();
        push_file(&mut files, FILE_TYPE_FV_IMAGE, &sections);
        finish_volume(&files)
    }

    #[test]
    fn rejects_bad_signature() {
        let mut fv = outer_volume(&inner_volume(0x1000), COMPRESSION_NONE);
        fv[40] ^= 0xFF; // signature byte
        assert_eq!(FirmwareVolume::parse(&fv).err(), Some(BootError::FvCorrupt));
    }

    #[test]
    fn rejects_truncated_volume() {
        let fv = outer_volume(&inner_volume(0x1000), COMPRESSION_NONE);
        assert_eq!(
            FirmwareVolume::parse(&fv[..40]).err(),
            Some(BootError::FvCorrupt)
        );
        // Declared length larger than the buffer.
        let mut short = fv.clone();
        short.truncate(fv.len() - 8);
        assert_eq!(FirmwareVolume::parse(&short).err(), Some(BootError::FvCorrupt));
    }

    #[test]
    fn stored_image_chains_to_entry() {
        let inner = inner_volume(0x2040);
        let outer_bytes = outer_volume(&inner, COMPRESSION_NONE);
        let outer = FirmwareVolume::parse(&outer_bytes).unwrap();

        let size = fv_image_uncompressed_size(&outer).unwrap() as usize;
        assert_eq!(size, inner.len());

        let mut scratch = vec![0u8; size];
        let written = decompress_fv_image(&outer, &mut scratch).unwrap();
        assert_eq!(written, inner.len());
        assert_eq!(scratch, inner);

        let base = scratch.as_ptr() as u64;
        let entry = find_core_entry(&scratch, base).unwrap();
        // Entry lands inside the PE payload at its RVA.
        let pe_offset = entry - base - 0x2040;
        let pe_bytes = &scratch[pe_offset as usize..];
        assert_eq!(&pe_bytes[..2], b"MZ");
    }

    #[test]
    fn compressed_image_inflates_and_chains() {
        let inner = inner_volume(0x1000);
        let outer_bytes = outer_volume(&inner, COMPRESSION_STANDARD);
        let outer = FirmwareVolume::parse(&outer_bytes).unwrap();

        let size = fv_image_uncompressed_size(&outer).unwrap() as usize;
        let mut scratch = vec![0u8; size];
        let written = decompress_fv_image(&outer, &mut scratch).unwrap();
        assert_eq!(&scratch[..written], &inner[..]);

        let entry = find_core_entry(&scratch[..written], 0x9200_0000).unwrap();
        assert!(entry > 0x9200_0000);
    }

    #[test]
    fn truncated_inflate_is_an_error() {
        let inner = inner_volume(0x1000);
        let mut outer_bytes = outer_volume(&inner, COMPRESSION_STANDARD);
        // Chop the tail of the compressed payload (keep the volume length
        // field consistent so the walker still finds the section).
        let keep = outer_bytes.len() - 16;
        for b in &mut outer_bytes[keep..] {
            *b = 0;
        }
        let outer = FirmwareVolume::parse(&outer_bytes).unwrap();
        let size = fv_image_uncompressed_size(&outer).unwrap() as usize;
        let mut scratch = vec![0u8; size];
        assert_eq!(
            decompress_fv_image(&outer, &mut scratch).err(),
            Some(BootError::DecompressFailed)
        );
    }

    #[test]
    fn missing_core_reported() {
        let inner = {
            // Volume with a file that is not the core.
            let mut sections = Vec::new();
            push_section(&mut sections, SECTION_PE32, &minimal_pe(0));
            let mut files = Vec::new();
            push_file(&mut files, FILE_TYPE_FV_IMAGE, &sections);
            finish_volume(&files)
        };
        assert_eq!(
            find_core_entry(&inner, 0).err(),
            Some(BootError::CoreNotFound)
        );
    }

    #[test]
    fn bad_pe_magics_rejected() {
        assert_eq!(pe_entry_rva(&[0u8; 16]).err(), Some(BootError::BadPeImage));
        let mut pe = minimal_pe(0x100);
        pe[0x40] = 0; // break the PE signature
        assert_eq!(pe_entry_rva(&pe).err(), Some(BootError::BadPeImage));
    }
}
