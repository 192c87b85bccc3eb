use camino::Utf8PathBuf;

#[cfg(target_os = "windows")]
pub const PYTHON_EXECUTABLE: &str = "python.exe";
#[cfg(not(target_os = "windows"))]
pub const PYTHON_EXECUTABLE: &str = "bin/python3";

#[cfg(target_os = "windows")]
pub fn default_install_roots() -> Vec<Utf8PathBuf> {
    ["ProgramW6432", "ProgramFiles"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|pf| Utf8PathBuf::from(pf).join("INRO").join("Emme").join("Emme 4"))
        .fold(Vec::new(), |mut acc, p| {
            if !acc.contains(&p) {
                acc.push(p);
            }
            acc
        })
}

#[cfg(not(target_os = "windows"))]
pub fn default_install_roots() -> Vec<Utf8PathBuf> {
    vec![Utf8PathBuf::from("/opt/INRO/Emme/Emme 4")]
}
