// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

use rstest::{fixture, rstest};

use super::*;
use crate::fixtures::{self, Repo, Seq};

#[fixture]
fn tmpdir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("pkgcore-config-")
        .tempdir()
        .expect("failed to create dir for test")
}

fn write(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[rstest]
#[case("pkgcore.conf", Some(Format::Ini))]
#[case("repos.ini", Some(Format::Ini))]
#[case("repos.dhcp", Some(Format::Dhcp))]
#[case("repos.mke2fs", Some(Format::Mke2fs))]
#[case("repos.yaml", None)]
#[case("pkgcore", None)]
fn test_format_from_path(#[case] path: &str, #[case] expected: Option<Format>) {
    assert_eq!(Format::from_path(Path::new(path)), expected);
}

#[rstest]
#[case("ini", Format::Ini)]
#[case("DHCP", Format::Dhcp)]
#[case("mke2fs", Format::Mke2fs)]
fn test_format_from_str(#[case] input: &str, #[case] expected: Format) {
    assert_eq!(input.parse::<Format>().unwrap(), expected);
    assert_eq!(expected.to_string().parse::<Format>().unwrap(), expected);
}

#[rstest]
fn test_format_from_str_unknown() {
    let err = "yaml".parse::<Format>().unwrap_err();
    assert!(err.to_string().contains("unknown config format \"yaml\""), "{err}");
}

#[rstest]
fn test_format_configurables_are_builtins() {
    let registry = Registry::with_builtins();
    for format in [Format::Ini, Format::Dhcp, Format::Mke2fs] {
        assert!(registry.get(format.configurable_name()).is_some());
    }
}

#[rstest]
fn test_read_source_missing(tmpdir: tempfile::TempDir) {
    let path = tmpdir.path().join("missing.conf");
    let err = read_source(&path).unwrap_err();
    match err.kind() {
        ErrorKind::Io { path: reported, .. } => assert_eq!(reported, &path),
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[rstest]
fn test_load_file_by_extension(tmpdir: tempfile::TempDir) {
    let path = write(&tmpdir, "repos.dhcp", "r { cache warm; }\n");
    let source = load_file(&path, None).unwrap();
    assert_eq!(source.names().collect::<Vec<_>>(), ["r"]);
    let origin = source.origin().unwrap();
    assert!(origin.ends_with("repos.dhcp"), "{origin}");
}

#[rstest]
fn test_load_file_forced_format(tmpdir: tempfile::TempDir) {
    let path = write(&tmpdir, "repos.conf", "[r]\ncache = warm\n");
    let source = load_file(&path, Some(Format::Mke2fs)).unwrap();
    assert_eq!(source.names().collect::<Vec<_>>(), ["r"]);

    let path = write(&tmpdir, "unknown.txt", "[r]\ncache = warm\n");
    assert_eq!(load_file(&path, None).unwrap().len(), 1);
}

#[rstest]
fn test_load_file_missing(tmpdir: tempfile::TempDir) {
    let err = load_file(&tmpdir.path().join("absent.conf"), None).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Io { .. }), "{err:?}");
}

#[rstest]
fn test_load_config_priority(tmpdir: tempfile::TempDir) {
    let file = write(
        &tmpdir,
        "pkgcore.conf",
        &format!(
            "[r]\nclass = {repo}\ncache = file\n\n[numbers]\nclass = {seq}\nseq = 1\n",
            repo = fixtures::REPO,
            seq = fixtures::SEQ,
        ),
    );
    let prepend = fixtures::source(vec![(
        "r",
        fixtures::strings(&[("class", fixtures::REPO), ("cache", "prepended")]),
    )]);
    let append = fixtures::source(vec![
        ("numbers", fixtures::strings(&[("class", fixtures::SEQ), ("seq", "9")])),
        ("extra", fixtures::strings(&[("class", fixtures::SEQ), ("seq", "2")])),
    ]);
    let options = LoadOptions {
        prepend_sources: vec![prepend],
        append_sources: vec![append],
        skip_config_files: true,
        files: vec![file],
        ..Default::default()
    };
    let m = load_config(fixtures::registry(), &options).unwrap();
    assert_eq!(m.sources().len(), 3);

    let repo = m.objects("repo").get("r").unwrap().unwrap();
    assert_eq!(repo.downcast_ref::<Repo>().map(|r| r.cache.as_str()), Some("prepended"));
    let numbers = m.objects("seq").get("numbers").unwrap().unwrap();
    assert_eq!(numbers.downcast_ref::<Seq>(), Some(&Seq(vec!["1".into()])));
    assert!(m.objects("seq").contains("extra").unwrap());
}

#[rstest]
fn test_load_config_debug_option() {
    let options = LoadOptions {
        skip_config_files: true,
        debug: true,
        ..Default::default()
    };
    let m = load_config(Registry::new(), &options).unwrap();
    assert!(m.debug());
    assert!(m.sections().is_empty());
}
