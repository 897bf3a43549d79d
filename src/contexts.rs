use serde::Serialize;

#[derive(Serialize)]
pub struct SuffixRule {
    pub ext: String,
    pub command: String,
}

#[derive(Serialize)]
pub struct InstallRule {
    pub source: String,
    pub destination: String,
    pub file_name: String,
}

#[derive(Serialize)]
pub struct MakefileContext<'a> {
    pub build_file: &'a str,
    pub target: String,
    pub ofiles: String,
    pub hfiles: String,
    pub cc: &'a str,
    pub cxx: &'a str,
    pub link: &'a str,
    pub cppflags: String,
    pub cflags: String,
    pub cxxflags: String,
    pub incpath: String,
    pub lflags: String,
    pub libs: String,
    pub suffix_rules: Vec<SuffixRule>,
    pub module_dir: String,
    pub installs: Vec<InstallRule>,
    pub clean_files: Vec<String>,
}
