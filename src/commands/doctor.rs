use colored::Colorize;
use declarative::{ManagedResource, ToggleResource};

use crate::Context;
use crate::commands::apt_backend;
use crate::config::{self, LoadedConfig};
use crate::distro::DistroIdentity;
use crate::error::Result;
use crate::host::{Host, SystemHost};
use crate::resource::{SigningKey, SourceEntry, SourcePackages};
use crate::targets::{APT_TOOLS, Environment, InterpreterTarget, RepositoryTarget};
use crate::ui;
use aptkit::Backend;
use toolchain::{HttpTransport, MakeBuild};

struct Issue {
    category: &'static str,
    summary: String,
    fix: Option<String>,
}

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("debrig doctor");

    let mut issues: Vec<Issue> = Vec::new();
    let host = SystemHost;

    let loaded = config::load(ctx.config.as_deref())?;
    check_config(&loaded);

    check_privilege(&host, &mut issues);
    check_tools(&host, &mut issues);

    let distro = check_distro(&loaded, &mut issues);
    if let Some(distro) = &distro {
        check_source_packages(&loaded, distro, &mut issues);
        check_repositories(&loaded, distro, ctx.verbose > 0, &mut issues);
    }
    check_python(&loaded);

    println!();
    if issues.is_empty() {
        ui::success("Host is ready");
    } else {
        print_issue_summary(&issues);
    }

    Ok(())
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        println!(
            "  {}  {} {}",
            format!("{}.", i + 1).bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
    }
}

fn check_config(loaded: &LoadedConfig) {
    ui::section("Configuration");
    match &loaded.source {
        Some(path) => ui::kv("file", &path.display().to_string()),
        None => ui::kv("file", "none (built-in defaults)"),
    }
    let names: Vec<&str> = loaded.config.repositories.keys().map(String::as_str).collect();
    ui::kv("profiles", &names.join(", "));
}

fn check_privilege(host: &dyn Host, issues: &mut Vec<Issue>) {
    ui::section("Privilege");
    let root = host.is_root();
    ui::check(root, "root", if root { "" } else { "(not root)" });
    if !root {
        issues.push(Issue {
            category: "Privilege",
            summary: "Not running as root".into(),
            fix: Some("Run provisioning commands with sudo".into()),
        });
    }
}

fn check_tools(host: &dyn Host, issues: &mut Vec<Issue>) {
    ui::section("Required Commands");

    for tool in APT_TOOLS.iter().copied().chain(["make"]) {
        let found = host.has_tool(tool);
        ui::check(found, tool, if found { "" } else { "(missing)" });
        if !found {
            issues.push(Issue {
                category: "Required Commands",
                summary: format!("{tool} is not installed"),
                fix: Some(format!("apt-get install {}", package_for(tool))),
            });
        }
    }
}

fn package_for(tool: &str) -> &'static str {
    match tool {
        "apt-get" | "apt-cache" => "apt",
        "dpkg" | "dpkg-query" => "dpkg",
        "make" => "make",
        _ => "apt",
    }
}

fn check_distro(loaded: &LoadedConfig, issues: &mut Vec<Issue>) -> Option<DistroIdentity> {
    ui::section("Distribution");

    match DistroIdentity::detect(&loaded.config.paths.os_release) {
        Ok(distro) => {
            ui::kv("name", &distro.display_name());
            ui::kv("distributor", distro.distributor_id());
            ui::kv("codename", distro.codename());
            Some(distro)
        }
        Err(e) => {
            ui::error(&format!("{e:#}"));
            issues.push(Issue {
                category: "Distribution",
                summary: "Could not identify the distribution".into(),
                fix: Some(format!(
                    "Check {} or set [paths] os_release",
                    loaded.config.paths.os_release.display()
                )),
            });
            None
        }
    }
}

fn check_source_packages(
    loaded: &LoadedConfig,
    distro: &DistroIdentity,
    issues: &mut Vec<Issue>,
) {
    ui::section("Source Packages");

    let toggle = SourcePackages::new(&loaded.config.paths.sources_list, distro.codename());
    match toggle.observe() {
        Ok(state) => ui::kv("deb-src", &state.to_string()),
        Err(e) => {
            ui::warn(&format!("{e:#}"));
            issues.push(Issue {
                category: "Source Packages",
                summary: "python builds cannot toggle deb-src".into(),
                fix: Some(format!(
                    "Add a one-line `deb` entry for {} to {}",
                    distro.codename(),
                    loaded.config.paths.sources_list.display()
                )),
            });
        }
    }
}

fn check_repositories(
    loaded: &LoadedConfig,
    distro: &DistroIdentity,
    verbose: bool,
    issues: &mut Vec<Issue>,
) {
    ui::section("Repositories");

    let apt = apt_backend(loaded);
    let transport = HttpTransport::default();
    let build = MakeBuild;
    let env = Environment {
        apt: &apt,
        transport: &transport,
        build: &build,
        distro,
        paths: &loaded.config.paths,
    };

    let selections = apt.list_selections().unwrap_or_default();

    for (name, profile) in &loaded.config.repositories {
        let target = RepositoryTarget::new(name, profile.clone());
        let resolved = match target.resolve(&env) {
            Ok(resolved) => resolved,
            Err(e) => {
                ui::check(false, name, &e.to_string());
                issues.push(Issue {
                    category: "Repositories",
                    summary: format!("Profile {name} cannot be resolved on this host"),
                    fix: None,
                });
                continue;
            }
        };

        let key = SigningKey::new(&resolved.key_url, &resolved.key_path, env.transport);
        let entry = SourceEntry::new(&resolved.registration, &env.paths.managed_list);
        let key_present = key.observe().is_ok_and(|s| s.is_present());
        let entry_present = entry.observe().is_ok_and(|s| s.is_present());

        let installed = profile
            .purge_regexes()
            .map(|patterns| aptkit::matching_names(&selections, &patterns).len())
            .unwrap_or_default();

        let state = match (key_present, entry_present) {
            (true, true) => "registered",
            (false, false) => "not registered",
            _ => "partially registered",
        };
        ui::check(
            key_present == entry_present,
            name,
            &format!("{state}, {installed} package(s) installed"),
        );
        if verbose {
            ui::dim(&format!("    {}", entry.line()));
            ui::dim(&format!("    {}", key.path().display()));
        }

        if key_present != entry_present {
            issues.push(Issue {
                category: "Repositories",
                summary: format!("{name} has a key or an entry but not both"),
                fix: Some(format!("sudo debrig repo {name} --replace")),
            });
        }
    }
}

fn check_python(loaded: &LoadedConfig) {
    ui::section("Python");

    let target = InterpreterTarget::new(loaded.config.python.clone());
    match target.layout() {
        Ok(layout) => {
            let built = layout.binary.exists();
            ui::check(
                built,
                &loaded.config.python.version,
                &layout.binary.display().to_string(),
            );
        }
        Err(e) => ui::warn(&e.to_string()),
    }
}
