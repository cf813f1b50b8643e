use vergen_gitcl::{BuildBuilder, CargoBuilder, Emitter, GitclBuilder, RustcBuilder};

/// Git variables `version.rs` reads, with the value used when neither git nor
/// the build environment provides one.
const GIT_FALLBACKS: [(&str, &str); 4] = [
    ("VERGEN_GIT_SHA", "unknown"),
    ("VERGEN_GIT_BRANCH", "unknown"),
    ("VERGEN_GIT_COMMIT_TIMESTAMP", "unknown"),
    ("VERGEN_GIT_DIRTY", "false"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::all_build()?;
    let cargo = CargoBuilder::all_cargo()?;
    let rustc = RustcBuilder::all_rustc()?;

    let mut emitter = Emitter::default();
    emitter
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?;

    match GitclBuilder::all_git() {
        Ok(git) => {
            emitter.add_instructions(&git)?;
        }
        Err(_) => {
            // Container and CI builds pass git metadata as build args
            for (var, default) in GIT_FALLBACKS {
                let value = std::env::var(var).unwrap_or_else(|_| default.to_string());
                println!("cargo::rustc-env={var}={value}");
            }
        }
    }

    emitter.emit()?;

    Ok(())
}
