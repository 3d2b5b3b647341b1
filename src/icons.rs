use eframe::egui;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type IconImage = Arc<egui::ColorImage>;

pub const ICON_SIDE_PX: usize = 48;

const CACHE_MAGIC: &[u8; 4] = b"FLI2";
const CACHE_HEADER_LEN: u64 = 16;
/// Larger entries are treated as corrupt.
const MAX_CACHED_SIDE: usize = 256;

/// Source of tile icons. Absence is a valid answer; callers substitute
/// [`default_icon`].
pub trait IconResolver {
    fn resolve(&self, path: &Path) -> Option<IconImage>;
}

/// Shell-backed resolver with an on-disk RGBA cache keyed by source path.
pub struct ShellIconResolver {
    cache_dir: Option<PathBuf>,
    side: usize,
}

impl ShellIconResolver {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            side: ICON_SIDE_PX,
        }
    }
}

impl IconResolver for ShellIconResolver {
    fn resolve(&self, path: &Path) -> Option<IconImage> {
        if let Some(dir) = &self.cache_dir {
            if let Some(img) = load_cached_icon_at(dir, path) {
                return Some(Arc::new(img));
            }
        }

        let img = extract_icon(path)?;
        let img = resize_to_square(&img, self.side);
        if let Some(dir) = &self.cache_dir {
            save_cached_icon_at(dir, path, &img);
        }
        Some(Arc::new(img))
    }
}

#[cfg(windows)]
fn extract_icon(path: &Path) -> Option<egui::ColorImage> {
    let source = crate::system::resolve_shortcut_target(path)
        .filter(|p| p.exists())
        .unwrap_or_else(|| path.to_path_buf());
    shell::extract_icon_from_file(&source)
}

#[cfg(not(windows))]
fn extract_icon(_path: &Path) -> Option<egui::ColorImage> {
    None
}

#[cfg(windows)]
mod shell {
    use eframe::egui;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows::Win32::Graphics::Gdi::{
        CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits, GetObjectW, BITMAP, BITMAPINFO,
        BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HGDIOBJ,
    };
    use windows::Win32::Storage::FileSystem::FILE_FLAGS_AND_ATTRIBUTES;
    use windows::Win32::UI::Shell::{SHGetFileInfoW, SHFILEINFOW, SHGFI_ICON, SHGFI_LARGEICON};
    use windows::Win32::UI::WindowsAndMessaging::{DestroyIcon, GetIconInfo, ICONINFO};

    pub fn extract_icon_from_file(path: &Path) -> Option<egui::ColorImage> {
        unsafe {
            let mut file_info = SHFILEINFOW::default();
            let path_wide: Vec<u16> = path
                .as_os_str()
                .encode_wide()
                .chain(std::iter::once(0))
                .collect();

            let found = SHGetFileInfoW(
                windows::core::PCWSTR(path_wide.as_ptr()),
                FILE_FLAGS_AND_ATTRIBUTES(0),
                Some(&mut file_info),
                std::mem::size_of::<SHFILEINFOW>() as u32,
                SHGFI_ICON | SHGFI_LARGEICON,
            );
            if found == 0 || file_info.hIcon.is_invalid() {
                return None;
            }
            let hicon = file_info.hIcon;

            let mut icon_info = ICONINFO::default();
            if GetIconInfo(hicon, &mut icon_info).is_err() {
                let _ = DestroyIcon(hicon);
                return None;
            }

            let mut bitmap: BITMAP = std::mem::zeroed();
            let has_bitmap = GetObjectW(
                HGDIOBJ(icon_info.hbmColor.0),
                std::mem::size_of::<BITMAP>() as i32,
                Some(&mut bitmap as *mut _ as *mut _),
            ) != 0;

            let pixels = if has_bitmap {
                let width = bitmap.bmWidth as usize;
                let height = bitmap.bmHeight as usize;
                let hdc = CreateCompatibleDC(None);
                let mut bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: width as i32,
                        biHeight: -(height as i32),
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let mut buf: Vec<u8> = vec![0; width * height * 4];
                let lines = GetDIBits(
                    hdc,
                    icon_info.hbmColor,
                    0,
                    height as u32,
                    Some(buf.as_mut_ptr() as *mut _),
                    &mut bmi,
                    DIB_RGB_COLORS,
                );
                let _ = DeleteDC(hdc);
                (lines != 0).then_some((width, height, buf))
            } else {
                None
            };

            let _ = DeleteObject(icon_info.hbmColor);
            let _ = DeleteObject(icon_info.hbmMask);
            let _ = DestroyIcon(hicon);

            let (width, height, mut buf) = pixels?;
            // BGRA -> RGBA
            for chunk in buf.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }
            Some(egui::ColorImage::from_rgba_unmultiplied(
                [width, height],
                &buf,
            ))
        }
    }
}

fn stable_hash64(input: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in input {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn icon_cache_path_at(cache_dir: &Path, source_path: &Path) -> PathBuf {
    let key = stable_hash64(source_path.to_string_lossy().to_ascii_lowercase().as_bytes());
    cache_dir.join(format!("{:016x}.rgba", key))
}

fn load_cached_icon_at(cache_dir: &Path, source_path: &Path) -> Option<egui::ColorImage> {
    let cache_path = icon_cache_path_at(cache_dir, source_path);
    let mut file = std::fs::File::open(cache_path).ok()?;
    let file_len = file.metadata().ok()?.len();

    let mut header = [0u8; CACHE_HEADER_LEN as usize];
    file.read_exact(&mut header).ok()?;
    if &header[0..4] != CACHE_MAGIC {
        return None;
    }
    let width = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let height = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let len = u32::from_le_bytes([header[12], header[13], header[14], header[15]]) as usize;
    if width > MAX_CACHED_SIDE
        || height > MAX_CACHED_SIDE
        || len != width.saturating_mul(height).saturating_mul(4)
        || len as u64 > file_len.saturating_sub(CACHE_HEADER_LEN)
    {
        return None;
    }

    let mut pixels = vec![0u8; len];
    file.read_exact(&mut pixels).ok()?;
    Some(egui::ColorImage::from_rgba_unmultiplied(
        [width, height],
        &pixels,
    ))
}

fn save_cached_icon_at(cache_dir: &Path, source_path: &Path, image: &egui::ColorImage) {
    if std::fs::create_dir_all(cache_dir).is_err() {
        return;
    }
    let cache_path = icon_cache_path_at(cache_dir, source_path);
    let Ok(mut file) = std::fs::File::create(cache_path) else {
        return;
    };

    let rgba: Vec<u8> = image.pixels.iter().flat_map(|c| c.to_srgba_unmultiplied()).collect();
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(CACHE_MAGIC);
    out[4..8].copy_from_slice(&(image.size[0] as u32).to_le_bytes());
    out[8..12].copy_from_slice(&(image.size[1] as u32).to_le_bytes());
    out[12..16].copy_from_slice(&(rgba.len() as u32).to_le_bytes());
    let _ = file.write_all(&out);
    let _ = file.write_all(&rgba);
}

pub fn resize_to_square(image: &egui::ColorImage, side: usize) -> egui::ColorImage {
    let src_w = image.size[0];
    let src_h = image.size[1];
    if (src_w == side && src_h == side) || src_w == 0 || src_h == 0 {
        return image.clone();
    }
    let mut pixels = Vec::with_capacity(side * side);
    for y in 0..side {
        let sy = y * src_h / side;
        for x in 0..side {
            let sx = x * src_w / side;
            pixels.push(image.pixels[sy * src_w + sx]);
        }
    }
    egui::ColorImage {
        size: [side, side],
        pixels,
    }
}

/// Generic tile used whenever a target has no icon of its own.
pub fn default_icon() -> IconImage {
    let side = ICON_SIDE_PX;
    let fill = egui::Color32::from_rgb(96, 125, 160);
    let edge = egui::Color32::from_rgb(205, 221, 238);
    let border = side / 12;
    let mut pixels = Vec::with_capacity(side * side);
    for y in 0..side {
        for x in 0..side {
            let on_edge =
                x < border || y < border || x >= side - border || y >= side - border;
            pixels.push(if on_edge { edge } else { fill });
        }
    }
    Arc::new(egui::ColorImage {
        size: [side, side],
        pixels,
    })
}
