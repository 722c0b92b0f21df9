//! Minimal synthetic samples for every cataloged format.

#![allow(dead_code)]

use romkit::formats::dmg::NINTENDO_LOGO;
use romkit::{MemFile, SharedFile};

pub fn mem(data: Vec<u8>, name: &str) -> SharedFile {
    SharedFile::new(MemFile::with_name(data, name))
}

fn put(buf: &mut [u8], off: usize, bytes: &[u8]) {
    buf[off..off + bytes.len()].copy_from_slice(bytes);
}

fn put_utf16(buf: &mut [u8], off: usize, s: &str) {
    for (i, u) in s.encode_utf16().enumerate() {
        put(buf, off + i * 2, &u.to_le_bytes());
    }
}

/// XDBF with one string table per `(language id, [(string id, text)])`.
pub fn xdbf(tables: &[(u64, &[(u16, &str)])]) -> Vec<u8> {
    let blobs: Vec<Vec<u8>> = tables
        .iter()
        .map(|(_, strings)| {
            let mut body = Vec::new();
            for (id, s) in strings.iter() {
                body.extend_from_slice(&id.to_be_bytes());
                body.extend_from_slice(&(s.len() as u16).to_be_bytes());
                body.extend_from_slice(s.as_bytes());
            }
            let mut out = b"XSTR".to_vec();
            out.extend_from_slice(&1u32.to_be_bytes());
            out.extend_from_slice(&((body.len() + 6) as u32).to_be_bytes());
            out.extend_from_slice(&(strings.len() as u16).to_be_bytes());
            out.extend_from_slice(&body);
            out
        })
        .collect();

    let n = tables.len() as u32;
    let mut out = b"XDBF".to_vec();
    for v in [0x10000u32, n, n, 0, 0] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    let mut offset = 0u32;
    for ((lang, _), blob) in tables.iter().zip(&blobs) {
        out.extend_from_slice(&3u16.to_be_bytes());
        out.extend_from_slice(&lang.to_be_bytes());
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&(blob.len() as u32).to_be_bytes());
        offset += blob.len() as u32;
    }
    for blob in &blobs {
        out.extend_from_slice(blob);
    }
    out
}

pub fn smdh(title: &str) -> Vec<u8> {
    let mut b = vec![0u8; 0x36C0];
    put(&mut b, 0, b"SMDH");
    // English slot
    put_utf16(&mut b, 0x8 + 0x200, title);
    b
}

pub fn dmg(title: &str) -> Vec<u8> {
    let mut r = vec![0u8; 0x8000];
    put(&mut r, 0x100, &[0x00, 0xC3, 0x50, 0x01]);
    put(&mut r, 0x104, &NINTENDO_LOGO);
    put(&mut r, 0x134, title.as_bytes());
    r[0x14B] = 0x01;
    let sum = r[0x134..0x14D].iter().fold(0xE7u8, |a, &b| a.wrapping_sub(b));
    r[0x14D] = sum;
    r
}

pub fn gbs(title: &str) -> Vec<u8> {
    let mut b = vec![0u8; 0x170];
    put(&mut b, 0, b"GBS\x01");
    b[4] = 1;
    b[5] = 1;
    put(&mut b, 0x10, title.as_bytes());
    b
}

pub fn vgm() -> Vec<u8> {
    let mut b = vec![0u8; 0x100];
    put(&mut b, 0, b"Vgm ");
    put(&mut b, 8, &0x0150u32.to_le_bytes());
    put(&mut b, 0x18, &44_100u32.to_le_bytes());
    b
}

pub fn sid(name: &str) -> Vec<u8> {
    let mut b = vec![0u8; 0x100];
    put(&mut b, 0, b"PSID");
    put(&mut b, 4, &2u16.to_be_bytes());
    put(&mut b, 0x0E, &1u16.to_be_bytes());
    put(&mut b, 0x16, name.as_bytes());
    b
}

pub fn bnr1(name: &str) -> Vec<u8> {
    let mut b = vec![0u8; 0x1820 + 0x140];
    put(&mut b, 0, b"BNR1");
    put(&mut b, 0x1820, name.as_bytes());
    b
}

/// game.com ROM with the header at `addr` (0 or 0x40000).
pub fn gamecom(addr: usize) -> Vec<u8> {
    let mut b = vec![0u8; addr + 0x8000];
    put(&mut b, addr + 5, b"TigerDMGC");
    put(&mut b, addr + 0x11, b"TIGER");
    b
}

/// 64 KiB WonderSwan ROM; `color` selects the system id.
pub fn wonderswan(color: bool) -> Vec<u8> {
    let mut b = vec![0xFFu8; 0x10000];
    let f = b.len() - 16;
    put(&mut b, f, &[0xEA, 0, 0, 0, 0xF0, 0x00, 0x01, color as u8, 0x01, 0, 0, 0, 0, 0, 0, 0]);
    b
}

/// Dreamcast `.vms` data file, header at 0.
pub fn vms(desc: &str) -> Vec<u8> {
    let mut b = vec![0u8; 3 * 512];
    b[..0x40].fill(b' ');
    put(&mut b, 0, desc.as_bytes());
    put(&mut b, 0x10, desc.as_bytes());
    put(&mut b, 0x30, b"ROMKIT");
    b[0x40] = 1;
    b
}

/// `.vmi` pointing at a `.vms` named `resource`.
pub fn vmi(resource: &str) -> Vec<u8> {
    let mut b = vec![0u8; 0x6C];
    let mut name = [0u8; 8];
    name[..resource.len()].copy_from_slice(resource.as_bytes());
    for (i, s) in b"SEGA".iter().enumerate() {
        b[i] = name[i] & s;
    }
    put(&mut b, 0x04, b"Index");
    put(&mut b, 0x24, b"Copyright");
    put(&mut b, 0x44, &1999u16.to_le_bytes());
    put(&mut b, 0x46, &[9, 9, 12, 0, 0, 4]);
    put(&mut b, 0x50, &name);
    put(&mut b, 0x58, b"SAVEFILE");
    b
}
