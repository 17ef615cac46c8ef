//! Integration tests for loading manifests from disk in every format

use std::fs;
use std::path::PathBuf;

use depfile_pkg::conanfile::{self, CONANFILE_TXT};
use depfile_pkg::recipe::CONANFILE_PY;
use depfile_pkg::{
    load, Config, DependencySpec, Generator, LoaderConfig, ManifestError, PackageManifest,
    CONFIG_FILE, MANIFEST_FILE,
};
use tempfile::TempDir;

const FIRST_REVISION: &str = "\
name: status-cpp
version: 0.1.0
generator: cmake_find_package
dependencies:
  - openssl/1.1.1h
";

const SECOND_REVISION: &str = "\
name: status-cpp
version: 0.1.0
generator: cmake_find_package
dependencies:
  - openssl/1.1.1h
  - boost/1.74.0
options:
  boost:shared = False
";

fn write(dir: &TempDir, file: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_both_manifest_revisions_load() {
    let dir = TempDir::new().unwrap();

    let path = write(&dir, MANIFEST_FILE, FIRST_REVISION);
    let first = PackageManifest::from_path(&path).unwrap();
    assert_eq!(first.dependencies().len(), 1);
    assert!(first.options().is_empty());

    let path = write(&dir, MANIFEST_FILE, SECOND_REVISION);
    let second = PackageManifest::from_path(&path).unwrap();
    assert_eq!(second.dependencies().len(), 2);
    assert_eq!(second.option("boost:shared"), Some("False"));

    // Same package, one more requirement
    assert_eq!(first.name(), second.name());
    assert_eq!(first.dependencies()[0], second.dependencies()[0]);
}

#[test]
fn test_written_manifest_reads_back() {
    for content in [FIRST_REVISION, SECOND_REVISION] {
        let manifest = PackageManifest::parse(content).unwrap();
        let written = manifest.to_manifest_string();
        assert_eq!(written, content);
        assert_eq!(PackageManifest::parse(&written).unwrap(), manifest);
    }
}

#[test]
fn test_built_manifest_round_trips() {
    let manifest = PackageManifest::builder("status-cpp", "0.2.0")
        .generator(Generator::CmakeDeps)
        .unwrap()
        .dependency("zlib/[>=1.2 <2.0]".parse().unwrap())
        .unwrap()
        .dependency("boost/1.74.0@conan/stable".parse().unwrap())
        .unwrap()
        .option("zlib:shared".parse().unwrap(), "True")
        .unwrap()
        .option("boost:without_python".parse().unwrap(), "True")
        .unwrap()
        .build()
        .unwrap();

    let reparsed = PackageManifest::parse(&manifest.to_string()).unwrap();
    assert_eq!(reparsed, manifest);
}

#[test]
fn test_empty_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, MANIFEST_FILE, "");
    let err = PackageManifest::from_path(&path).unwrap_err();
    assert!(matches!(err, ManifestError::Parse(_)));
}

#[test]
fn test_conflicting_duplicate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        MANIFEST_FILE,
        "name: status-cpp\nversion: 0.1.0\ndependencies:\n  - boost/1.74.0\n  - boost/1.75.0\n",
    );
    let err = PackageManifest::from_path(&path).unwrap_err();
    assert!(matches!(err, ManifestError::DuplicateDependency { .. }));
    assert_eq!(
        err.to_string(),
        "duplicate dependency 'boost': 'boost/1.74.0' conflicts with 'boost/1.75.0'"
    );
}

#[test]
fn test_reference_example() {
    let manifest = PackageManifest::parse(FIRST_REVISION).unwrap();
    let openssl = manifest.dependency("openssl").unwrap();
    assert_eq!(*openssl, DependencySpec::new("openssl", "1.1.1h").unwrap());
    assert_eq!(openssl.package_name(), "openssl");
    assert_eq!(openssl.version_constraint(), "1.1.1h");
}

#[test]
fn test_recipe_and_native_agree() {
    let dir = TempDir::new().unwrap();
    let recipe = write(
        &dir,
        CONANFILE_PY,
        r#"from conans import ConanFile

class ConanPackage(ConanFile):
    name = 'status-cpp'
    version = "0.1.0"

    generators = 'cmake_find_package'

    requires = [
        ('openssl/1.1.1h')
    ]

    default_options = (
    )
"#,
    );

    let imported = load(&recipe, &LoaderConfig::default()).unwrap();
    assert_eq!(imported, PackageManifest::parse(FIRST_REVISION).unwrap());
}

#[test]
fn test_conanfile_txt_export_import() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("status-cpp");
    fs::create_dir(&project).unwrap();

    let manifest = PackageManifest::parse(SECOND_REVISION).unwrap();
    let txt = project.join(CONANFILE_TXT);
    fs::write(&txt, conanfile::to_txt(&manifest)).unwrap();

    let imported = depfile_pkg::load_txt_as(&txt, "status-cpp", "0.1.0", &LoaderConfig::default())
        .unwrap();
    assert_eq!(imported, manifest);
}

#[test]
fn test_discovered_config_applies() {
    let dir = TempDir::new().unwrap();
    write(&dir, CONFIG_FILE, "[loader]\nstrict-options = true\n");
    let path = write(
        &dir,
        MANIFEST_FILE,
        "name: status-cpp\nversion: 0.1.0\noptions:\n  boost:shared = False\n",
    );

    // Lenient by default
    assert!(PackageManifest::from_path(&path).is_ok());

    let config = Config::discover(dir.path()).unwrap();
    let err = load(&path, &config.loader).unwrap_err();
    assert!(matches!(err, ManifestError::UndeclaredOption { .. }));
}
