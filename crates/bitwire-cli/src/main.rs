use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use bitwire_core::schema::{parse_message, serialize_message};
use bitwire_core::{
    BoxOptions, ByteOrder, JsonReadOptions, LengthAware, MessageSchema, ParseError,
    PositionAware, ReadBuffer, ReadBufferByteBased, ReadBufferJsonBased, ReadBufferXmlBased,
    WriteBufferBoxBased, WriteBufferByteBased, WriteBufferJsonBased, WriteBufferXmlBased,
    XmlReadOptions,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BITWIRE_BUILD_INFO"), ")");

#[derive(Parser, Debug)]
#[command(name = "bitwire")]
#[command(version = VERSION)]
#[command(
    about = "Decode and encode bit-level binary messages described by a JSON layout.",
    long_about = None,
    after_help = "Examples:\n  bitwire decode --schema frame.json --hex \"85 12 34\"\n  bitwire decode --schema frame.json --input frame.bin --format xml\n  bitwire encode --schema frame.json --fixture frame.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode bytes into a box diagram, JSON, or XML.
    Decode {
        /// Message layout (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Input bytes as hex digits; whitespace and a 0x prefix are ignored
        #[arg(long, required_unless_present = "input", conflicts_with = "input")]
        hex: Option<String>,

        /// Binary input file
        #[arg(long)]
        input: Option<PathBuf>,

        /// Multi-byte values are little-endian
        #[arg(long)]
        little_endian: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Boxed)]
        format: OutputFormat,

        /// Box output: collapse contexts with a single child
        #[arg(long)]
        merge: bool,

        /// Box output: drop boxes without content
        #[arg(long)]
        omit_empty: bool,

        /// Box output: target width in columns
        #[arg(long, default_value_t = 120)]
        width: usize,

        /// Box output: print position/length under every field
        #[arg(long)]
        footer: bool,
    },
    /// Encode a JSON or XML rendering back into bytes.
    Encode {
        /// Message layout (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Document produced by `bitwire decode --format json|xml`
        #[arg(long)]
        fixture: PathBuf,

        /// Fixture format (default: from the file extension)
        #[arg(long, value_enum)]
        fixture_format: Option<FixtureFormat>,

        /// Multi-byte values are little-endian
        #[arg(long)]
        little_endian: bool,

        /// Skip dataType/bitLength/isList checks in the fixture
        #[arg(long)]
        lenient: bool,

        /// Write raw bytes to this file instead of hex to stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[value(name = "box")]
    Boxed,
    Json,
    Xml,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FixtureFormat {
    Json,
    Xml,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            schema,
            hex,
            input,
            little_endian,
            format,
            merge,
            omit_empty,
            width,
            footer,
        } => cmd_decode(DecodeArgs {
            schema,
            hex,
            input,
            byte_order: byte_order(little_endian),
            format,
            box_options: BoxOptions {
                desired_width: width,
                merge_single_boxes: merge,
                omit_empty_boxes: omit_empty,
                print_pos_length_footer: footer,
            },
        }),
        Commands::Encode {
            schema,
            fixture,
            fixture_format,
            little_endian,
            lenient,
            output,
        } => cmd_encode(
            &schema,
            &fixture,
            fixture_format,
            byte_order(little_endian),
            lenient,
            output.as_deref(),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => failure.report(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BITWIRE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn byte_order(little_endian: bool) -> ByteOrder {
    if little_endian {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    }
}

/// The step of a command that failed; it picks the exit code and the
/// prefix of the error line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Schema,
    Input,
    Decode,
    Render,
    Fixture,
    Encode,
    Output,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Schema => "schema",
            Stage::Input => "input",
            Stage::Decode => "decode",
            Stage::Render => "render",
            Stage::Fixture => "fixture",
            Stage::Encode => "encode",
            Stage::Output => "output",
        }
    }

    /// 2 for bad arguments or files, 1 when the data itself did not fit.
    fn exit_code(self) -> u8 {
        match self {
            Stage::Schema | Stage::Input | Stage::Fixture | Stage::Output => 2,
            Stage::Decode | Stage::Render | Stage::Encode => 1,
        }
    }
}

#[derive(Debug)]
struct Failure {
    stage: Stage,
    detail: String,
    hint: Option<String>,
}

impl Failure {
    fn new(stage: Stage, detail: impl std::fmt::Display) -> Self {
        Self {
            stage,
            detail: detail.to_string(),
            hint: None,
        }
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn report(&self) -> ExitCode {
        eprintln!("error: {}: {}", self.stage.label(), self.detail);
        if let Some(hint) = &self.hint {
            eprintln!("hint: {hint}");
        }
        ExitCode::from(self.stage.exit_code())
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, Failure>;
}

impl<T> AtStage<T> for anyhow::Result<T> {
    fn at(self, stage: Stage) -> Result<T, Failure> {
        self.map_err(|err| Failure::new(stage, format!("{err:#}")))
    }
}

struct DecodeArgs {
    schema: PathBuf,
    hex: Option<String>,
    input: Option<PathBuf>,
    byte_order: ByteOrder,
    format: OutputFormat,
    box_options: BoxOptions,
}

fn cmd_decode(args: DecodeArgs) -> Result<(), Failure> {
    let schema = load_schema(&args.schema)?;
    let bytes = match (&args.hex, &args.input) {
        (Some(text), _) => parse_hex(text)?,
        (None, Some(path)) => fs::read(path)
            .with_context(|| format!("cannot read {}", path.display()))
            .at(Stage::Input)?,
        (None, None) => {
            return Err(Failure::new(Stage::Input, "no bytes to decode").hint("use --hex or --input"));
        }
    };

    let mut rb = ReadBufferByteBased::with_byte_order(&bytes, args.byte_order);
    let value = parse_message(&schema, &mut rb).map_err(|err| decode_failure(&schema, &bytes, err))?;
    if rb.has_more(8) {
        tracing::warn!(
            trailing_bytes = bytes.len() - rb.pos().div_ceil(8),
            "input is longer than the layout"
        );
    }

    let rendered = match args.format {
        OutputFormat::Boxed => {
            let mut wb = WriteBufferBoxBased::new(args.box_options);
            serialize_message(&schema, &value, &mut wb)
                .context("box diagram")
                .at(Stage::Render)?;
            wb.get_box().map(ToString::to_string).unwrap_or_default()
        }
        OutputFormat::Json => {
            let mut wb = WriteBufferJsonBased::new();
            serialize_message(&schema, &value, &mut wb)
                .and_then(|()| wb.json_string())
                .context("JSON document")
                .at(Stage::Render)?
        }
        OutputFormat::Xml => {
            let mut wb = WriteBufferXmlBased::new();
            serialize_message(&schema, &value, &mut wb)
                .and_then(|()| wb.xml_string())
                .context("XML document")
                .at(Stage::Render)?
        }
    };
    println!("{rendered}");
    Ok(())
}

fn cmd_encode(
    schema_path: &Path,
    fixture: &Path,
    fixture_format: Option<FixtureFormat>,
    byte_order: ByteOrder,
    lenient: bool,
    output: Option<&Path>,
) -> Result<(), Failure> {
    let schema = load_schema(schema_path)?;
    let document = fs::read_to_string(fixture)
        .with_context(|| format!("cannot read {}", fixture.display()))
        .at(Stage::Fixture)?;
    let format = fixture_format.unwrap_or_else(|| infer_fixture_format(fixture));
    let fixture_failure = |err: ParseError| {
        let rendering = match format {
            FixtureFormat::Json => "JSON",
            FixtureFormat::Xml => "XML",
        };
        Failure::new(Stage::Fixture, err).hint(format!(
            "the fixture must be a {rendering} rendering of the '{}' layout; use --lenient to skip attribute checks",
            schema.name
        ))
    };

    let mut reader: Box<dyn ReadBuffer> = match format {
        FixtureFormat::Json => Box::new(
            ReadBufferJsonBased::new(document.as_bytes())
                .map_err(fixture_failure)?
                .with_options(JsonReadOptions {
                    validate_attributes: !lenient,
                }),
        ),
        FixtureFormat::Xml => Box::new(
            ReadBufferXmlBased::from_document(&document)
                .map_err(fixture_failure)?
                .with_options(XmlReadOptions {
                    validate_attributes: !lenient,
                    validate_list: !lenient,
                }),
        ),
    };
    let value = parse_message(&schema, reader.as_mut()).map_err(fixture_failure)?;

    let capacity = schema.checked_length_in_bits().map(|bits| bits.div_ceil(8)).ok_or_else(|| {
        Failure::new(Stage::Schema, format!("layout '{}' is too long to encode", schema.name))
    })?;
    let mut wb = WriteBufferByteBased::with_byte_order(capacity, byte_order);
    serialize_message(&schema, &value, &mut wb).map_err(|err| {
        Failure::new(Stage::Encode, err).hint("check that every value fits its declared bit length")
    })?;

    match output {
        Some(path) => {
            fs::write(path, wb.bytes())
                .with_context(|| format!("cannot write {}", path.display()))
                .at(Stage::Output)?;
            eprintln!("OK: {} bytes written -> {}", wb.bytes().len(), path.display());
        }
        None => println!("{}", hex::encode(wb.bytes())),
    }
    Ok(())
}

fn infer_fixture_format(path: &Path) -> FixtureFormat {
    let is_xml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if is_xml {
        FixtureFormat::Xml
    } else {
        FixtureFormat::Json
    }
}

fn load_schema(path: &Path) -> Result<MessageSchema, Failure> {
    if !path.exists() {
        return Err(
            Failure::new(Stage::Schema, format!("schema file not found: {}", path.display()))
                .hint("pass a JSON layout with --schema"),
        );
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))
        .at(Stage::Schema)?;
    MessageSchema::from_json(&text).map_err(|err| {
        Failure::new(Stage::Schema, format!("{}: {err}", path.display())).hint(
            "fields need a \"type\" of bit, uint, int, float, string, bytes, group or array",
        )
    })
}

fn parse_hex(text: &str) -> Result<Vec<u8>, Failure> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    hex::decode(digits).map_err(|err| {
        Failure::new(Stage::Input, format!("invalid hex: {err}"))
            .hint("expected pairs of hex digits, e.g. \"0a ff 10\"")
    })
}

fn decode_failure(schema: &MessageSchema, bytes: &[u8], err: ParseError) -> Failure {
    let exhausted = matches!(err, ParseError::Exhausted { .. });
    let failure = Failure::new(Stage::Decode, err);
    if !exhausted {
        return failure;
    }
    failure.hint(format!(
        "the '{}' layout needs {} bytes, input has {}",
        schema.name,
        schema.length_in_bytes(),
        bytes.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_exit_with_one() {
        assert_eq!(Stage::Input.exit_code(), 2);
        assert_eq!(Stage::Decode.exit_code(), 1);
        assert_eq!(Stage::Encode.exit_code(), 1);
    }

    #[test]
    fn hex_input_ignores_spacing_and_prefix() {
        assert_eq!(parse_hex("0x0a ff\n10").unwrap(), vec![0x0a, 0xff, 0x10]);
        let failure = parse_hex("abc").unwrap_err();
        assert_eq!(failure.stage, Stage::Input);
        assert!(failure.hint.is_some());
    }

    #[test]
    fn anyhow_context_is_kept() {
        let failure = Err::<(), _>(anyhow::anyhow!("disk full"))
            .context("cannot write out.bin")
            .at(Stage::Output)
            .unwrap_err();
        assert_eq!(failure.detail, "cannot write out.bin: disk full");
    }
}
