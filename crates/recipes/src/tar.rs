//! GNU tar, built with autotools

use cpkg_errors::RecipeError;
use cpkg_recipe::validate::invalid;
use cpkg_recipe::{
    Advisories, AutotoolsBuild, BuildStrategy, CompiledBuild, ConfValue, ConfigDelta, EnvAction,
    FileEdit, PackageIdInfo, PackageInfo, PackagePlan, Recipe, RecipeContext, RecipeDescriptor,
    Requirement, SourceTable, ToolConfig,
};
use cpkg_types::{Os, PackageType, SettingKey};

/// Compressors tar invokes by name at runtime
const COMPRESSORS: &[(&str, &str)] = &[
    ("bzip2", "1.0.8"),
    ("lzip", "1.23"),
    ("xz_utils", "5.4.4"),
    ("zstd", "1.5.5"),
];

const CONFIGURE_ARGS: &[&str] = &[
    "--disable-acl",
    "--disable-nls",
    "--disable-rpath",
    "--without-posix-acls",
    "--without-selinux",
    "--with-gzip=gzip",
    "--with-bzip2=bzip2",
    "--with-lzip=lzip",
    "--with-lzma=lzma",
    "--without-lzop",
    "--with-xz=xz",
    "--with-zstd=zstd",
];

#[derive(Debug, Clone)]
pub struct Tar {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Tar {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("tar", PackageType::Application)
                .description("GNU Tar provides the ability to create tar archives, as well as various other kinds of manipulation.")
                .licenses(&["GPL-3-or-later"])
                .homepage("https://www.gnu.org/software/tar/")
                .topics(&["archive"]),
            sources: crate::sources("tar", include_str!("../data/tar.toml"))?,
        })
    }
}

impl Recipe for Tar {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn configure(&self, _ctx: &RecipeContext) -> Result<ConfigDelta, RecipeError> {
        Ok(ConfigDelta::none().c_only())
    }

    fn build_requirements(&self, _ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        COMPRESSORS
            .iter()
            .map(|(name, version)| Requirement::tool(name, version).map(|r| r.visible(true)))
            .collect()
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        if ctx.settings().os == Some(Os::Windows) {
            return Err(invalid(ctx, "This recipe does not support Windows builds"));
        }
        if let Some(bzip2) = ctx.dependencies().build("bzip2") {
            if !bzip2.option_enabled("build_executable") {
                return Err(invalid(ctx, "bzip2:build_executable must be enabled"));
            }
        }
        Ok(Advisories::new())
    }

    fn strategy(&self, ctx: &RecipeContext) -> BuildStrategy {
        let mut build =
            CompiledBuild::new(ToolConfig::Autotools(AutotoolsBuild::new().args(CONFIGURE_ARGS)));
        if ctx.settings().is_msvc() {
            build = build.edit(FileEdit::replace(
                "gnu/faccessat.c",
                "_GL_INCLUDING_UNISTD_H",
                "_GL_INCLUDING_UNISTD_H_NOP",
            ));
        }
        build.into()
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new()
            .license("COPYING")
            .install()
            .rmdir("share")
            .rmdir("libexec")
    }

    fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::application();
        info.conf
            .insert("user.tar:tar".to_string(), ConfValue::Path("bin/tar".into()));
        info.env.push(EnvAction::DefinePath {
            name: "TAR".to_string(),
            path: "bin/tar".into(),
        });
        info.append_path("bin");
        info
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.without_setting(SettingKey::Compiler)
    }
}
