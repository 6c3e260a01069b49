//! Output rendering and formatting

use crate::report::{
    CachedPackage, CommandResult, CreateReport, RecipeDetails, RecipeSummary, ValidationReport,
};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use cpkg_config::Config;
use cpkg_types::ColorChoice;
use std::collections::BTreeMap;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render a command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = result.to_json().map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Recipes(recipes) => self.render_recipe_list(recipes),
            CommandResult::Recipe(details) => self.render_recipe_details(details),
            CommandResult::Validation(report) => self.render_validation(report),
            CommandResult::Created(report) => self.render_created(report),
            CommandResult::Packages(packages) => self.render_packages(packages),
            CommandResult::Config(config) => Self::render_config(config),
        }
    }

    fn render_recipe_list(&self, recipes: &[RecipeSummary]) -> io::Result<()> {
        let mut table = new_table(&["Recipe", "Type", "Versions", "Description"]);
        for recipe in recipes {
            table.add_row(vec![
                Cell::new(&recipe.name).fg(self.accent()),
                Cell::new(&recipe.package_type),
                Cell::new(recipe.versions.join(", ")),
                Cell::new(&recipe.description),
            ]);
        }
        self.term.write_line(&table.to_string())
    }

    fn render_recipe_details(&self, details: &RecipeDetails) -> io::Result<()> {
        println!("{}", self.style_name(&details.name));
        println!();
        println!("Description: {}", details.description);
        println!("Type:        {}", details.package_type);
        println!("License:     {}", details.licenses.join(", "));
        println!("Homepage:    {}", details.homepage);
        if !details.topics.is_empty() {
            println!("Topics:      {}", details.topics.join(", "));
        }
        println!("Settings:    {}", details.settings.join(", "));
        println!("Versions:    {}", details.versions.join(", "));

        if !details.options.is_empty() {
            println!();
            let mut table = new_table(&["Option", "Values", "Default"]);
            for option in &details.options {
                table.add_row(vec![
                    Cell::new(&option.name),
                    Cell::new(&option.values),
                    Cell::new(&option.default),
                ]);
            }
            println!("{table}");
        }
        Ok(())
    }

    fn render_validation(&self, report: &ValidationReport) -> io::Result<()> {
        println!(
            "{} {}",
            self.style_ok("valid"),
            self.style_name(&report.reference.to_string())
        );
        println!("Package id:  {}", report.package_id);
        print_pairs("Settings", &report.settings);
        print_pairs("Options", &report.options);
        if !report.removed_options.is_empty() {
            println!("Removed:     {}", report.removed_options.join(", "));
        }
        if !report.requirements.is_empty() {
            println!();
            println!("Requirements:");
            for requirement in &report.requirements {
                println!("  • {requirement}");
            }
        }
        self.render_advisories(&report.advisories);
        Ok(())
    }

    fn render_created(&self, report: &CreateReport) -> io::Result<()> {
        let verb = if report.reused { "reused" } else { "created" };
        println!(
            "{} {}:{}",
            self.style_ok(verb),
            self.style_name(&report.reference.to_string()),
            report.package_id
        );
        println!("Path:        {}", report.path.display());
        self.render_advisories(&report.advisories);
        Ok(())
    }

    fn render_packages(&self, packages: &[CachedPackage]) -> io::Result<()> {
        if packages.is_empty() {
            println!("No packages in the cache.");
            return Ok(());
        }

        for package in packages {
            let metadata = &package.metadata;
            println!(
                "{}:{}",
                self.style_name(&metadata.reference.to_string()),
                metadata.package_id
            );
            println!("Type:        {}", metadata.package_type);
            println!("Path:        {}", package.path.display());
            print_pairs("Settings", &metadata.settings);
            print_pairs("Options", &metadata.options);

            let cpp = &metadata.info.cpp;
            let mut table = new_table(&["Field", "Value"]);
            for (field, values) in [
                ("libs", &cpp.libs),
                ("system_libs", &cpp.system_libs),
                ("frameworks", &cpp.frameworks),
                ("defines", &cpp.defines),
            ] {
                if !values.is_empty() {
                    table.add_row(vec![Cell::new(field), Cell::new(values.join(" "))]);
                }
            }
            for (name, component) in &metadata.info.components {
                table.add_row(vec![
                    Cell::new(format!("component {name}")),
                    Cell::new(component.libs.join(" ")),
                ]);
            }
            if !metadata.requires.is_empty() {
                let requires: Vec<String> =
                    metadata.requires.iter().map(ToString::to_string).collect();
                table.add_row(vec![Cell::new("requires"), Cell::new(requires.join(", "))]);
            }
            if table.row_count() > 0 {
                println!("{table}");
            }
            println!();
        }
        Ok(())
    }

    fn render_config(config: &Config) -> io::Result<()> {
        let rendered = config.to_toml().map_err(io::Error::other)?;
        print!("{rendered}");
        Ok(())
    }

    fn render_advisories(&self, advisories: &[String]) {
        if advisories.is_empty() {
            return;
        }
        println!();
        for advisory in advisories {
            println!("{} {advisory}", self.style_warning("warning:"));
        }
    }

    fn colors_enabled(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }

    fn accent(&self) -> Color {
        if self.colors_enabled() {
            Color::Cyan
        } else {
            Color::Reset
        }
    }

    fn styled(&self, style: Style, text: &str) -> String {
        if self.colors_enabled() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn style_name(&self, name: &str) -> String {
        self.styled(Style::new().bold().cyan(), name)
    }

    fn style_ok(&self, text: &str) -> String {
        self.styled(Style::new().green(), text)
    }

    fn style_warning(&self, text: &str) -> String {
        self.styled(Style::new().yellow(), text)
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn print_pairs(label: &str, pairs: &BTreeMap<String, String>) {
    if pairs.is_empty() {
        return;
    }
    let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    println!("{:<13}{}", format!("{label}:"), joined.join(" "));
}
