use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("target no longer exists: {}", .0.display())]
    Missing(PathBuf),
    #[error("shell refused to open {} (code {code})", .path.display())]
    Shell { path: PathBuf, code: isize },
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Starts whatever a shortcut points at.
pub trait ProcessLauncher {
    fn launch(&self, path: &Path) -> Result<(), LaunchError>;

    /// Shows the target selected in the system file manager.
    fn reveal(&self, path: &Path) -> Result<(), LaunchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, path: &Path) -> Result<(), LaunchError> {
        if !path.exists() {
            return Err(LaunchError::Missing(path.to_path_buf()));
        }
        shell_open(path)
    }

    fn reveal(&self, path: &Path) -> Result<(), LaunchError> {
        reveal_in_file_manager(path)
    }
}

#[cfg(windows)]
fn shell_open(path: &Path) -> Result<(), LaunchError> {
    use std::os::windows::ffi::OsStrExt;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SHOW_WINDOW_CMD;

    let operation = to_wide("open");
    let path_wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let working_dir: Option<Vec<u16>> = path.parent().map(|dir| {
        dir.as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    });
    let code = unsafe {
        ShellExecuteW(
            HWND(std::ptr::null_mut()),
            PCWSTR(operation.as_ptr()),
            PCWSTR(path_wide.as_ptr()),
            PCWSTR(std::ptr::null()),
            working_dir
                .as_ref()
                .map(|w| PCWSTR(w.as_ptr()))
                .unwrap_or(PCWSTR(std::ptr::null())),
            SHOW_WINDOW_CMD(1),
        )
    }
    .0 as isize;
    if code > 32 {
        Ok(())
    } else {
        Err(LaunchError::Shell {
            path: path.to_path_buf(),
            code,
        })
    }
}

#[cfg(not(windows))]
fn shell_open(path: &Path) -> Result<(), LaunchError> {
    open::that(path).map_err(|source| LaunchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(windows)]
fn reveal_in_file_manager(path: &Path) -> Result<(), LaunchError> {
    std::process::Command::new("explorer.exe")
        .arg(format!("/select,{}", path.display()))
        .spawn()
        .map(|_| ())
        .map_err(|source| LaunchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(windows))]
fn reveal_in_file_manager(path: &Path) -> Result<(), LaunchError> {
    let folder = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    };
    open::that(folder).map_err(|source| LaunchError::Io {
        path: folder.to_path_buf(),
        source,
    })
}

#[cfg(windows)]
fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Target of a `.lnk` shell link, used to pick the icon of what the link
/// points at.
#[cfg(windows)]
pub fn resolve_shortcut_target(path: &Path) -> Option<PathBuf> {
    use std::os::windows::ffi::OsStrExt;
    use windows::core::{Interface, PCWSTR};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Storage::FileSystem::WIN32_FIND_DATAW;
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CoUninitialize, IPersistFile, CLSCTX_INPROC_SERVER,
        COINIT_APARTMENTTHREADED, STGM_READ,
    };
    use windows::Win32::UI::Shell::{IShellLinkW, ShellLink, SLGP_RAWPATH, SLR_ANY_MATCH, SLR_NO_UI};

    let is_lnk = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("lnk"))
        .unwrap_or(false);
    if !is_lnk {
        return None;
    }

    unsafe {
        let com_initialized = CoInitializeEx(None, COINIT_APARTMENTTHREADED).is_ok();

        let result = (|| {
            let shell_link: IShellLinkW =
                CoCreateInstance(&ShellLink, None, CLSCTX_INPROC_SERVER).ok()?;
            let persist_file: IPersistFile = shell_link.cast().ok()?;

            let shortcut_wide: Vec<u16> = path
                .as_os_str()
                .encode_wide()
                .chain(std::iter::once(0))
                .collect();
            persist_file
                .Load(PCWSTR(shortcut_wide.as_ptr()), STGM_READ)
                .ok()?;
            let _ = shell_link.Resolve(
                HWND(std::ptr::null_mut()),
                (SLR_NO_UI | SLR_ANY_MATCH).0 as u32,
            );

            let mut target_buf = vec![0u16; 4096];
            let mut find_data = WIN32_FIND_DATAW::default();
            let _ = shell_link.GetPath(&mut target_buf, &mut find_data, SLGP_RAWPATH.0 as u32);
            let target = utf16z_to_string(&target_buf);
            let target = target.trim();
            if target.is_empty() {
                None
            } else {
                Some(PathBuf::from(target))
            }
        })();

        if com_initialized {
            CoUninitialize();
        }
        result
    }
}

#[cfg(windows)]
fn utf16z_to_string(wide: &[u16]) -> String {
    let end = wide.iter().position(|c| *c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}
