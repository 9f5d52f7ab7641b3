// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::process::ExitCode;

use clap::Parser;
use log::error;
use odsfs_ds_file::FileBlockSource;
use odsfs_ods2::{File, Filesystem};

/// Default disk image path, matching the reference driver's compiled-in
/// constant.
const DEFAULT_DISK: &str = "ods2.disk";

#[derive(Parser)]
#[command(about = "Lists every file on an ODS-2 volume image")]
struct Args {
    /// Path to the ODS-2 volume image.
    #[arg(long, default_value = DEFAULT_DISK)]
    disk: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let source = match FileBlockSource::open(&args.disk) {
        Ok(source) => source,
        Err(err) => {
            error!("failed to open {}: {err}", args.disk);
            return ExitCode::FAILURE;
        }
    };

    let mut fs = Filesystem::new(source);
    if let Err(err) = fs.mount() {
        error!("failed to mount volume: {err}");
        return ExitCode::FAILURE;
    }

    let root = match fs.open_root_dir() {
        Ok(root) => root,
        Err(err) => {
            error!("error opening root directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    recurse_directory(&root, "000000.DIR");
    ExitCode::SUCCESS
}

/// Depth-first walk over `dir`, printing `leading_path:name` for every
/// entry. Does not descend into the MFD's self-reference.
fn recurse_directory<DS: odsfs_ds::BlockSource>(dir: &File<DS>, leading_path: &str) {
    let entries = match dir.read_dir_entries() {
        Ok(entries) => entries,
        Err(err) => {
            error!("error reading directory '{leading_path}': {err}");
            return;
        }
    };

    for entry in &entries {
        let file = match dir.open_file_in_dir(&entry.name, Some(entry.version)) {
            Ok(file) => file,
            Err(err) => {
                error!("error opening file '{}': {err}", entry.name);
                continue;
            }
        };

        println!("{leading_path}:{}", entry.name);

        match file.is_dir() {
            Ok(true) => {
                if leading_path == "000000.DIR" && entry.name == "000000.DIR" {
                    continue;
                }
                let child_path = format!("{leading_path}:{}", entry.name);
                recurse_directory(&file, &child_path);
            }
            Ok(false) => {}
            Err(err) => error!("error reading characteristics of '{}': {err}", entry.name),
        }
    }
}
