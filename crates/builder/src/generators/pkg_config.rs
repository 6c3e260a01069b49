//! pkg-config `.pc` files for host dependencies

use super::{GeneratedFile, LinkFlags};
use crate::paths::slashed;
use cpkg_recipe::DependencyInfo;
use std::fmt::Write;

fn relative_to_prefix(prefix: &str, dir: &str) -> String {
    match dir.strip_prefix(prefix) {
        Some(rest) => format!("${{prefix}}{rest}"),
        None => dir.to_string(),
    }
}

pub(crate) fn pc_file(dep: &DependencyInfo) -> GeneratedFile {
    let name = dep
        .info
        .cpp
        .property("pkg_config_name")
        .map_or_else(|| dep.reference.name.clone(), ToString::to_string);
    let prefix = slashed(&dep.package_folder);
    let flags = LinkFlags::of(dep);

    let mut libs: Vec<String> = flags
        .libdirs
        .iter()
        .map(|d| format!("-L{}", relative_to_prefix(&prefix, d)))
        .collect();
    libs.extend(flags.libs.iter().map(|l| format!("-l{l}")));
    libs.extend(flags.system_libs.iter().map(|l| format!("-l{l}")));
    libs.extend(flags.frameworks.iter().map(|f| format!("-framework {f}")));

    let mut cflags: Vec<String> = flags
        .includedirs
        .iter()
        .map(|d| format!("-I{}", relative_to_prefix(&prefix, d)))
        .collect();
    cflags.extend(flags.defines.iter().map(|d| format!("-D{d}")));

    let mut out = String::new();
    let _ = writeln!(out, "prefix={prefix}\n");
    let _ = writeln!(out, "Name: {name}");
    let _ = writeln!(out, "Description: {} packaged by cpkg", dep.reference.name);
    let _ = writeln!(out, "Version: {}", dep.reference.version);
    let _ = writeln!(out, "Libs: {}", libs.join(" "));
    let _ = writeln!(out, "Cflags: {}", cflags.join(" "));

    GeneratedFile::new(format!("{name}.pc"), out)
}
