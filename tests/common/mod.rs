use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const HEADER: &str =
    "Nama,Kelas,JenisKelamin,Provinsi,SekolahKotaKabupaten,SekolahNama,Kategori,Nilai,DurasiMenit,S Algoritma,S_Struktur Data";

/// Small results table with every optional column present.
pub const RESULTS: &[&str] = &[
    "Ani,7,P,Jawa Barat,Bandung,SMP 1 Bandung,Penggalang,80,40,4,3",
    "Budi,8,L,Jawa Barat,Bogor,SMP 2 Bogor,Penggalang,60,30,2,3",
    "Citra,1,P,Bali,Denpasar,SD 3 Denpasar,Siaga,90,45,5,4",
    "Dewi,2,P,Bali,Denpasar,SD 3 Denpasar,Siaga,\"72,5\",35,3,",
    "Eko,10,L,,Depok,SMA 1 Depok,Penegak,55,25,1,2",
    "Fajar,7,,Jawa Barat,Bandung,SMP 1 Bandung,Penggalang,90,50,4,5",
];

pub fn write_csv(dir: &TempDir, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn results_table(dir: &TempDir) -> PathBuf {
    write_csv(dir, "results.csv", HEADER, RESULTS)
}
