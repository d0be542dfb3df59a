use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use g3dres::data::buffer::{Memory, ResBuffer};
use g3dres::data::decompress::ZlibDecompressor;
use g3dres::data::loader::{DEFAULT_SCRATCH_SIZE, Loader, LoaderConfig};
use g3dres::export::material_dump::{self, FileDump};
use g3dres::export::{InfoOptions, search_programs, shader_info, stage_code};
use g3dres::models::{ResFile, ShaderFile};
use g3dres::shader::SearchQuery;
use g3dres::shader::query::DEFAULT_NAME;
use rootcause::prelude::*;
use tracing::{debug, error, info};

const DEFAULT_ARCHIVE: &str = "material.Product.140.product.Nin_NX_NVN.bfsha";
const EXTERNAL_STRINGS: &str = "Shader/ExternalBinaryString.bfres.mc";

/// Inspect NintendoWare model files and shader archives
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Size in bytes of the work memory used to decompress files
    #[clap(long, global = true, default_value_t = DEFAULT_SCRATCH_SIZE)]
    scratch_size: usize,

    /// Read files into memory instead of mapping them
    #[clap(long, global = true)]
    no_mmap: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump the shader selection of every material found under `<romfs>/Model`
    Dump {
        /// Decompressed material shader archive
        #[clap(long, default_value = DEFAULT_ARCHIVE)]
        shader_archive: PathBuf,

        /// External string file. Defaults to `<romfs>/Shader/ExternalBinaryString.bfres.mc`
        #[clap(long)]
        external_binary_string: Option<PathBuf>,

        #[clap(short, long, default_value = "Materials.json")]
        output: PathBuf,

        /// Directory containing `Model/`
        romfs: PathBuf,
    },
    /// Find every program of a shader archive matching a JSON query
    Search {
        /// Decompressed shader archive
        #[clap(long, default_value = DEFAULT_ARCHIVE)]
        shader_archive: PathBuf,

        /// Print every option not at its default rather than just the constrained ones
        #[clap(long)]
        verbose: bool,

        /// Print matches as JSON
        #[clap(long)]
        json: bool,

        /// JSON search query
        query: PathBuf,
    },
    /// Write the options and resources of a shading model to a JSON file
    Info {
        /// Decompressed shader archive
        #[clap(long, default_value = DEFAULT_ARCHIVE)]
        shader_archive: PathBuf,

        /// Name the archive must have. Defaults to the shading model name
        #[clap(long)]
        archive_name: Option<String>,

        /// Also list the binding slots of this program
        #[clap(long)]
        program: Option<usize>,

        /// Write the program's per-stage code and control sections into this directory
        #[clap(long, requires = "program")]
        code_dir: Option<PathBuf>,

        #[clap(short, long, default_value = "ShaderInfo.json")]
        output: PathBuf,

        /// Shading model to describe. Every model when omitted, `material` with --program
        model: Option<String>,
    },
}

fn load_shader_archive(loader: &mut Loader, path: &Path) -> Result<ResBuffer, Report> {
    let mut buffer = loader
        .load(path)
        .context_with(|| format!("Failed to open {}", path.display()))?;
    ShaderFile::relocate(&mut buffer)
        .context_with(|| format!("{} is not a shader archive", path.display()))?;
    Ok(buffer)
}

fn dump_model_file(
    loader: &mut Loader,
    path: &Path,
    external: &ResBuffer,
    shaders: &ShaderFile<'_>,
) -> Result<FileDump, Report> {
    let mut buffer = loader.load(path).context("Failed to read file")?;
    ResFile::prepare(&mut buffer, Some(external)).context("Failed to relocate file")?;
    let file = ResFile::new(Memory::new(&buffer).with_external(external))?;
    Ok(material_dump::dump_file(&file, shaders)?)
}

fn is_model_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".bfres") || name.ends_with(".bfres.mc"))
}

/// Returns whether every model file was dumped.
fn dump(
    loader: &mut Loader,
    shader_archive: &Path,
    external_binary_string: Option<PathBuf>,
    output: &Path,
    romfs: &Path,
) -> Result<bool, Report> {
    let shader_buffer = load_shader_archive(loader, shader_archive)?;
    let shaders = ShaderFile::new(Memory::new(&shader_buffer))?;

    let external_path = external_binary_string.unwrap_or_else(|| romfs.join(EXTERNAL_STRINGS));
    let mut external = loader
        .load(&external_path)
        .context_with(|| format!("Failed to open {}", external_path.display()))?;
    ResFile::relocate(&mut external)?;

    let pattern = romfs.join("Model").join("**").join("*");
    let pattern = pattern.to_string_lossy();
    let mut dumps = BTreeMap::new();
    let mut all_ok = true;
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if !path.is_file() || !is_model_file(&path) {
            continue;
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("dumping {}", path.display());
        match dump_model_file(loader, &path, &external, &shaders) {
            Ok(dump) => {
                dumps.insert(file_name, dump);
            }
            Err(e) => {
                error!("{}: {e}", path.display());
                all_ok = false;
            }
        }
    }

    let writer = BufWriter::new(
        File::create(output).context_with(|| format!("Failed to create {}", output.display()))?,
    );
    serde_json::to_writer_pretty(writer, &dumps)?;
    info!("wrote {} files to {}", dumps.len(), output.display());
    Ok(all_ok)
}

fn search(
    loader: &mut Loader,
    shader_archive: &Path,
    query: &Path,
    verbose: bool,
    json: bool,
) -> Result<(), Report> {
    let text = fs::read_to_string(query)
        .context_with(|| format!("Failed to read {}", query.display()))?;
    let query: SearchQuery = serde_json::from_str(&text)
        .context_with(|| format!("{} is not a search query", query.display()))?;

    let buffer = load_shader_archive(loader, shader_archive)?;
    let file = ShaderFile::new(Memory::new(&buffer))?;
    let matches = search_programs(&file, &query, verbose)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        for program in &matches {
            print!("{program}");
        }
    }
    info!("{} matching programs", matches.len());
    Ok(())
}

fn write_stage_code(
    file: &ShaderFile<'_>,
    model_name: &str,
    program: usize,
    dir: &Path,
) -> Result<(), Report> {
    let model = file.archive()?.shading_model(model_name)?;
    fs::create_dir_all(dir)?;
    for code in stage_code(&model, program)? {
        let stem = format!("{model_name}_{program}_{}", code.stage);
        fs::write(dir.join(format!("{stem}.code.bin")), code.code)?;
        fs::write(dir.join(format!("{stem}.control.bin")), code.control)?;
        info!("wrote {} stage of program {program}", code.stage);
    }
    Ok(())
}

fn info(
    loader: &mut Loader,
    shader_archive: &Path,
    archive_name: Option<String>,
    model: Option<String>,
    program: Option<usize>,
    code_dir: Option<PathBuf>,
    output: &Path,
) -> Result<(), Report> {
    let model = model.or_else(|| program.map(|_| DEFAULT_NAME.to_owned()));
    let archive_name = archive_name.or_else(|| model.clone());

    let buffer = load_shader_archive(loader, shader_archive)?;
    let file = ShaderFile::new(Memory::new(&buffer))?;
    let options = InfoOptions::builder()
        .maybe_archive_name(archive_name)
        .maybe_model_name(model.clone())
        .maybe_program_index(program)
        .build();
    let info = shader_info(&file, &options)?;

    let writer = BufWriter::new(
        File::create(output).context_with(|| format!("Failed to create {}", output.display()))?,
    );
    serde_json::to_writer_pretty(writer, &info)?;
    info!("wrote {} shading models to {}", info.models.len(), output.display());

    if let (Some(dir), Some(program)) = (code_dir, program) {
        let model = model.as_deref().unwrap_or(DEFAULT_NAME);
        write_stage_code(&file, model, program, &dir)?;
    }
    Ok(())
}

fn main() -> Result<ExitCode, Report> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = LoaderConfig::builder()
        .scratch_size(args.scratch_size)
        .use_mmap(!args.no_mmap)
        .build();
    let mut loader = Loader::new(config).with_decompressor(ZlibDecompressor);

    match args.command {
        Command::Dump {
            shader_archive,
            external_binary_string,
            output,
            romfs,
        } => {
            if !dump(
                &mut loader,
                &shader_archive,
                external_binary_string,
                &output,
                &romfs,
            )? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Search {
            shader_archive,
            verbose,
            json,
            query,
        } => search(&mut loader, &shader_archive, &query, verbose, json)?,
        Command::Info {
            shader_archive,
            archive_name,
            program,
            code_dir,
            output,
            model,
        } => info(
            &mut loader,
            &shader_archive,
            archive_name,
            model,
            program,
            code_dir,
            &output,
        )?,
    }
    Ok(ExitCode::SUCCESS)
}
