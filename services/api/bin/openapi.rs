use sciscroll_api::router::ApiDoc;
use utoipa::OpenApi;

/// Writes the OpenAPI document of the feed API to a file.
fn write_spec(api_doc: utoipa::openapi::OpenApi, path: &str) -> anyhow::Result<()> {
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    write_spec(ApiDoc::openapi(), &path)?;
    println!("OpenAPI document written to {path}");
    Ok(())
}
