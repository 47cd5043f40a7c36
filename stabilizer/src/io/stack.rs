//! Build-system detection over project manifests.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Build and test command lists derived from the detected manifests.
///
/// Multiple manifest types may co-exist (polyglot projects) and all
/// contribute commands; detection order fixes command order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackCommands {
    pub build_commands: Vec<String>,
    pub test_commands: Vec<String>,
}

impl StackCommands {
    /// No build commands means no run is possible; callers must treat this
    /// as a fatal precondition.
    pub fn is_empty(&self) -> bool {
        self.build_commands.is_empty()
    }
}

/// Directories never scanned for nested manifests.
const SKIPPED_DIRS: [&str; 2] = ["node_modules", "target"];

/// Inspect `root` for known build-system manifests and derive build/test
/// commands.
pub fn detect_stack(root: &Path) -> StackCommands {
    let mut commands = StackCommands::default();

    // Rust: root or one level deep (Tauri keeps the crate in src-tauri/).
    if let Some(dir) = find_manifest_dir(root, "Cargo.toml") {
        push_cargo_commands(root, &dir, &mut commands);
    }

    if root.join("package.json").exists() {
        detect_node(root, &mut commands);
    }

    if root.join("go.mod").exists() {
        commands.build_commands.push("go build ./...".to_string());
        commands.test_commands.push("go test ./...".to_string());
    }

    if root.join("pyproject.toml").exists() || root.join("setup.py").exists() {
        commands
            .build_commands
            .push("python -m compileall . -q".to_string());
        commands
            .test_commands
            .push("python -m pytest -q".to_string());
    }

    if root.join("pom.xml").exists() {
        commands.build_commands.push("mvn compile -q".to_string());
        commands.test_commands.push("mvn test -q".to_string());
    } else if root.join("build.gradle").exists() || root.join("build.gradle.kts").exists() {
        commands
            .build_commands
            .push("./gradlew build -x test -q".to_string());
        commands.test_commands.push("./gradlew test -q".to_string());
    }

    if root.join("CMakeLists.txt").exists() {
        commands.build_commands.push("cmake --build build".to_string());
        commands
            .test_commands
            .push("ctest --test-dir build".to_string());
    } else if root.join("Makefile").exists() {
        commands.build_commands.push("make".to_string());
    }

    if root.join("Package.swift").exists() {
        commands.build_commands.push("swift build".to_string());
        commands.test_commands.push("swift test".to_string());
    }

    // Tauri projects: cover the backend crate even when the root manifest
    // scan missed it.
    if let Some(dir) = find_manifest_dir(root, "tauri.conf.json") {
        let has_cargo = commands.build_commands.iter().any(|c| c.contains("cargo"));
        if !has_cargo && dir.join("Cargo.toml").exists() {
            push_cargo_commands(root, &dir, &mut commands);
        }
    }

    debug!(
        build_commands = commands.build_commands.len(),
        test_commands = commands.test_commands.len(),
        "stack detection finished"
    );
    commands
}

fn push_cargo_commands(root: &Path, dir: &Path, commands: &mut StackCommands) {
    if dir == root {
        commands.build_commands.push("cargo build".to_string());
        commands.test_commands.push("cargo test".to_string());
        return;
    }
    let manifest = dir.join("Cargo.toml");
    if let Ok(relative) = manifest.strip_prefix(root) {
        commands.build_commands.push(format!(
            "cargo build --manifest-path {}",
            relative.display()
        ));
        commands
            .test_commands
            .push(format!("cargo test --manifest-path {}", relative.display()));
    }
}

/// The package-manager runner is chosen by lockfile presence; only script
/// entries that actually exist contribute commands.
fn detect_node(root: &Path, commands: &mut StackCommands) {
    let manifest = root.join("package.json");
    let contents = match fs::read_to_string(&manifest) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(err = %err, "unreadable package.json, skipping node commands");
            return;
        }
    };
    let package: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(err) => {
            warn!(err = %err, "malformed package.json, skipping node commands");
            return;
        }
    };

    let runner = if root.join("pnpm-lock.yaml").exists() {
        "pnpm"
    } else if root.join("yarn.lock").exists() {
        "yarn"
    } else {
        "npm run"
    };

    let scripts = package.get("scripts");
    if scripts.and_then(|s| s.get("build")).is_some() {
        commands.build_commands.push(format!("{runner} build"));
    }
    if scripts.and_then(|s| s.get("test")).is_some() {
        commands.test_commands.push(format!("{runner} test"));
    }
}

/// Find `filename` in `root` or one directory level down, skipping hidden
/// and build-artifact directories. Returns the containing directory.
fn find_manifest_dir(root: &Path, filename: &str) -> Option<PathBuf> {
    if root.join(filename).exists() {
        return Some(root.to_path_buf());
    }
    let entries = fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() && path.join(filename).exists() {
            return Some(path);
        }
    }
    None
}
