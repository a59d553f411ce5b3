#![allow(dead_code)]
use std::path::Path;
use std::sync::{Mutex, Once};

static LOGGER_INIT: Once = Once::new();

// CLI tests write into shared temp paths; serialize them.
pub static CLI_TEST_LOCK: Mutex<()> = Mutex::new(());

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .is_test(true)
            .init();
    });
}

pub const TRP_MAGIC: u32 = 0xDCA2_4D00;
pub const ENTRY_STRIDE: u32 = 64;

/// Builds TRP packages in memory, laid out the way the PS3 packer does it:
/// header, file table, then the blobs back to back.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    version: u32,
    table_offset: Option<usize>,
    files: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    pub fn v1() -> Self {
        PackageBuilder {
            version: 1,
            table_offset: None,
            files: Vec::new(),
        }
    }

    pub fn v2() -> Self {
        PackageBuilder {
            version: 2,
            ..PackageBuilder::v1()
        }
    }

    /// Overrides where the file table is written (defaults to 64 for v1 and 84 for v2).
    pub fn table_offset(mut self, offset: usize) -> Self {
        self.table_offset = Some(offset);
        self
    }

    pub fn file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.files.push((name.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let table_offset = self
            .table_offset
            .unwrap_or(if self.version == 2 { 84 } else { 64 });
        let data_start = table_offset + self.files.len() * ENTRY_STRIDE as usize;
        let total = data_start + self.files.iter().map(|(_, d)| d.len()).sum::<usize>();

        let mut buf = vec![0_u8; data_start];
        buf[0..4].copy_from_slice(&TRP_MAGIC.to_be_bytes());
        buf[4..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..16].copy_from_slice(&(total as u64).to_be_bytes());
        buf[16..20].copy_from_slice(&(self.files.len() as u32).to_be_bytes());
        buf[20..24].copy_from_slice(&ENTRY_STRIDE.to_be_bytes());
        if self.version == 2 {
            buf[28..48].copy_from_slice(&[0xAB; 20]);
        }

        let mut offset = data_start;
        for (i, (name, data)) in self.files.iter().enumerate() {
            let entry = table_offset + i * ENTRY_STRIDE as usize;
            buf[entry..entry + name.len()].copy_from_slice(name.as_bytes());
            buf[entry + 32..entry + 40].copy_from_slice(&(offset as u64).to_be_bytes());
            buf[entry + 40..entry + 48].copy_from_slice(&(data.len() as u64).to_be_bytes());
            offset += data.len();
        }

        for (_, data) in &self.files {
            buf.extend_from_slice(data);
        }

        buf
    }

    pub fn write_to(&self, path: impl AsRef<Path>) {
        std::fs::write(path, self.build()).unwrap();
    }
}

pub struct TrophySpec<'a> {
    pub id: &'a str,
    pub hidden: &'a str,
    pub ttype: &'a str,
    pub pid: &'a str,
    pub name: &'a str,
    pub detail: &'a str,
}

pub fn trophy_conf(npcommid: &str, title: &str, trophies: &[TrophySpec]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!--This file is created by SCE Trophy tool-->\n\
         <trophyconf version=\"1.1\" policy=\"large\">\n\
         <npcommid>{npcommid}</npcommid>\n\
         <trophyset-version>01.00</trophyset-version>\n\
         <parental-level license-area=\"default\">1</parental-level>\n\
         <title-name>{title}</title-name>\n\
         <title-detail>{title} trophies</title-detail>\n"
    );
    for t in trophies {
        xml.push_str(&format!(
            "<trophy id=\"{}\" hidden=\"{}\" ttype=\"{}\" pid=\"{}\"><name>{}</name><detail>{}</detail></trophy>\n",
            t.id, t.hidden, t.ttype, t.pid, t.name, t.detail
        ));
    }
    xml.push_str("</trophyconf>\n");
    xml
}

/// The smallest useful package: a single, visible platinum trophy "01".
pub fn minimal_conf() -> String {
    trophy_conf(
        "NPWR00001_00",
        "Minimal",
        &[TrophySpec {
            id: "01",
            hidden: "no",
            ttype: "P",
            pid: "-1",
            name: "Platinum",
            detail: "All trophies",
        }],
    )
}

pub const ICON_BYTES: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

pub fn sample_package() -> Vec<u8> {
    PackageBuilder::v2()
        .file("TROP.SFM", minimal_conf())
        .file("ICON0.PNG", b"package icon")
        .file("TROPCONF.SFM", b"<trophyconf/>")
        .file("TROP01.PNG", ICON_BYTES)
        .build()
}
