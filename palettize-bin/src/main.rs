//! Generate a color palette from an image by performing k-means clustering in the CIELAB color space.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

mod cli;

#[allow(clippy::wildcard_imports)]
use cli::*;

use std::{
    fmt::{self, Display},
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
    process::ExitCode,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use colored::Colorize;
use image::DynamicImage;
use palette::Srgb;
use palettize::{KmeansResult, LabPixels, PixelBuffer, PixelBufferError};

/// Record the running time of a function and print the elapsed time
macro_rules! time {
    ($name: literal, $verbose: expr, $func_call: expr) => {{
        let start = Instant::now();
        let result = $func_call;
        if $verbose {
            println!("{} took {}ms", $name, start.elapsed().as_millis());
        }
        result
    }};
}

/// Error cases for producing a palette
#[derive(Debug)]
enum Error {
    /// Failed to read or decode the image file
    ImageLoad(image::ImageError),
    /// Failed to read the avif file
    #[cfg(feature = "avif")]
    AvifRead(io::Error),
    /// Failed to decode the avif file
    #[cfg(feature = "avif")]
    AvifDecode(libavif_image::Error),
    /// The decoded image could not be used as a pixel buffer
    Buffer(PixelBufferError),
    /// Failed to write the palette bitmap
    Write {
        /// The destination path
        path: PathBuf,
        /// The underlying IO error
        source: io::Error,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ImageLoad(e) => write!(f, "Failed to load the image file: {e}"),
            #[cfg(feature = "avif")]
            Error::AvifRead(e) => write!(f, "Failed to read the avif file: {e}"),
            #[cfg(feature = "avif")]
            Error::AvifDecode(e) => write!(f, "Failed to decode the avif file: {e}"),
            Error::Buffer(e) => write!(f, "Failed to read the image pixels: {e}"),
            Error::Write { path, source } => {
                write!(f, "Failed to write the palette to {}: {source}", path.display())
            }
        }
    }
}

fn main() -> ExitCode {
    let options = Options::parse();

    let result = if options.check {
        check_image(&options.image)
    } else {
        generate_and_output_palette(&options)
    };

    // Returning Result<_> uses Debug printing instead of Display
    if let Err(e) = result {
        eprintln!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Print the dimensions of the image without running k-means
fn check_image(path: &Path) -> Result<(), Error> {
    let (width, height) = image_dimensions(path)?;
    println!("{}: {width}x{height}", path.display());
    Ok(())
}

/// Read the dimensions of the image at the given path
#[cfg(feature = "avif")]
fn image_dimensions(path: &Path) -> Result<(u32, u32), Error> {
    if is_avif(path) {
        let image = load_image(path)?;
        Ok(image::GenericImageView::dimensions(&image))
    } else {
        image::image_dimensions(path).map_err(Error::ImageLoad)
    }
}

/// Read the dimensions of the image at the given path
#[cfg(not(feature = "avif"))]
fn image_dimensions(path: &Path) -> Result<(u32, u32), Error> {
    image::image_dimensions(path).map_err(Error::ImageLoad)
}

/// Load an image, generate its palette, and output the result using the given options
fn generate_and_output_palette(options: &Options) -> Result<(), Error> {
    let seed = options.seed.unwrap_or_else(time_seed);
    if options.verbose {
        println!("Using seed {seed}");
    }

    let result = {
        let start = Instant::now();
        let result = generate_palette(options, seed)?;
        if options.verbose {
            println!("Palette generation took {}ms in total", start.elapsed().as_millis());
        }
        result
    };

    output_palette(&result, options)
}

/// The current time in seconds, truncated to 32 bits
fn time_seed() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());

    // only the low bits matter for seeding
    #[allow(clippy::cast_possible_truncation)]
    {
        secs as u32
    }
}

/// Decode, downscale, and cluster the image, returning the sorted result
fn generate_palette(options: &Options, seed: u32) -> Result<KmeansResult, Error> {
    let Options {
        cluster_count,
        sort,
        max_dimension,
        max_iter,
        verbose,
        ..
    } = *options;

    let image = time!("Image loading", verbose, load_image(&options.image))?;
    let pixels = pixel_buffer(image)?;
    let pixels = downscale(pixels, max_dimension, verbose);

    let lab = time!("Preprocessing", verbose, LabPixels::from_pixels(&pixels));

    let mut result = time!(
        "k-means",
        verbose,
        palettize::from_lab_pixels(&lab, cluster_count, max_iter, seed)
    );

    if verbose {
        println!(
            "k-means took {} iterations for {} clusters",
            result.iterations,
            result.centroids.len()
        );
    }
    if !result.converged {
        eprintln!(
            "Warning: k-means stopped after {} iterations without converging",
            result.iterations
        );
    }

    result.sort(sort);
    Ok(result)
}

/// Whether the path has an avif extension
#[cfg(feature = "avif")]
fn is_avif(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "avif")
}

/// Load the image at the given path
#[cfg(feature = "avif")]
fn load_image(path: &Path) -> Result<DynamicImage, Error> {
    if is_avif(path) {
        let buf = std::fs::read(path).map_err(Error::AvifRead)?;
        libavif_image::read(&buf).map_err(Error::AvifDecode)
    } else {
        image::open(path).map_err(Error::ImageLoad)
    }
}

/// Load the image at the given path
#[cfg(not(feature = "avif"))]
fn load_image(path: &Path) -> Result<DynamicImage, Error> {
    image::open(path).map_err(Error::ImageLoad)
}

/// Convert a decoded image into a tightly packed RGBA pixel buffer
fn pixel_buffer(image: DynamicImage) -> Result<PixelBuffer, Error> {
    let image = image.into_rgba8();
    let (width, height) = image.dimensions();
    let stride = width as usize * 4;
    PixelBuffer::new(image.into_raw(), width, height, stride).map_err(Error::Buffer)
}

/// Downscale the pixels if either dimension is larger than `max_dimension`
fn downscale(pixels: PixelBuffer, max_dimension: u32, verbose: bool) -> PixelBuffer {
    match time!("Downscaling", verbose, pixels.downscale(max_dimension)) {
        Some(resized) => {
            if verbose {
                println!(
                    "Downscaled the image from {}x{} to {}x{}",
                    pixels.width(),
                    pixels.height(),
                    resized.width(),
                    resized.height()
                );
            }
            resized
        }
        None => {
            if verbose {
                println!("Skipping downscaling since the image is within the max dimension");
            }
            pixels
        }
    }
}

/// Write or print the palette based off the provided options
fn output_palette(result: &KmeansResult, options: &Options) -> Result<(), Error> {
    let colors = palettize::srgb_palette(result);
    match options.output {
        FormatOutput::Bmp => time!(
            "Writing the palette",
            options.verbose,
            write_palette_bar(result, &options.dest)
        )?,

        FormatOutput::Hex => color_format_print(&colors, options.colorize, " ", palettize::hex),

        FormatOutput::Rgb => color_format_print(&colors, options.colorize, " ", |color| {
            format!("({},{},{})", color.red, color.green, color.blue)
        }),

        FormatOutput::Swatch => print_colors(&colors, "", |color| {
            "   "
                .on_truecolor(color.red, color.green, color.blue)
                .to_string()
        }),
    }

    Ok(())
}

/// Render the palette bar and write it as a bitmap to `path`
fn write_palette_bar(result: &KmeansResult, path: &Path) -> Result<(), Error> {
    let bar = palettize::palette_bar(result);
    let to_error = |source| Error::Write { path: path.to_owned(), source };

    let file = File::create(path).map_err(to_error)?;
    palettize::write_bmp(&bar, BufWriter::new(file)).map_err(to_error)
}

/// Print a line of colors using the given format
fn print_colors(colors: &[Srgb<u8>], delimiter: &str, format: impl Fn(Srgb<u8>) -> String) {
    println!(
        "{}",
        colors
            .iter()
            .map(|&color| format(color))
            .collect::<Vec<_>>()
            .join(delimiter)
    );
}

/// Format, colorize, and then print the text for all colors
fn color_format_print(
    colors: &[Srgb<u8>],
    colorize: Option<ColorizeOutput>,
    delimiter: &str,
    format: impl Fn(Srgb<u8>) -> String,
) {
    match colorize {
        Some(ColorizeOutput::Fg) => print_colors(colors, delimiter, |color| {
            format(color)
                .truecolor(color.red, color.green, color.blue)
                .to_string()
        }),

        Some(ColorizeOutput::Bg) => print_colors(colors, delimiter, |color| {
            format(color)
                .on_truecolor(color.red, color.green, color.blue)
                .to_string()
        }),

        None => print_colors(colors, delimiter, format),
    }
}
