use crate::fits::{format_fits_headers, read_fits_headers, FitsHeaders};
use crate::utils::escape_csv;
use anyhow::Result;
use std::path::Path;

pub fn read_headers(path: &str, all: bool, format: &str) -> Result<()> {
    let path = Path::new(path);
    if !path.is_file() {
        return Err(anyhow::anyhow!(
            "Path does not exist or is not a file: {}",
            path.display()
        ));
    }

    let headers = read_fits_headers(path)?;

    match format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&headers)?),
        "csv" => print!("{}", headers_to_csv(&headers)),
        _ => {
            println!("Reading FITS file: {}\n", path.display());
            println!("{}", format_fits_headers(&headers, all));
        }
    }

    Ok(())
}

fn headers_to_csv(headers: &FitsHeaders) -> String {
    let mut output = String::from("filename,hdu,key,value\n");
    for header in &headers.headers {
        let mut sorted_keys: Vec<_> = header.keywords.iter().collect();
        sorted_keys.sort_by_key(|&(k, _)| k);
        for (key, value) in sorted_keys {
            output.push_str(&format!(
                "{},{},{},{}\n",
                escape_csv(&headers.filename),
                header.hdu_index,
                escape_csv(key),
                escape_csv(value)
            ));
        }
    }
    output
}
