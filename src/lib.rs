pub mod chave;
pub mod display;
pub mod nfe_api;
mod utils;

use std::io::Write;

use anyhow::Context;
use clap::Parser;

pub use crate::chave::{ChaveError, InvoiceKey, SAMPLE_CHAVE};
use crate::display::{print_header, render, render_saldo};
pub use crate::nfe_api::{
    FetchError, NfeApiClient, RequestConfig, RequestMode, DEFAULT_HOST, DEFAULT_PORT,
};
use crate::nfe_api::InterceptResponse;
use crate::utils::write_strings_2_file;

/// Cliente para a API de consulta e download de NFe.
/// Intercepta a URL de download de uma NFe a partir da chave de acesso.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Chave de acesso da NFe (44 dígitos)
    pub chave: Option<String>,
    /// Host da API
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Porta da API
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Token do 2captcha repassado ao servidor (apenas no modo post)
    #[arg(long = "token2captcha")]
    pub token2captcha: Option<String>,
    #[arg(short = 'm', long, value_enum, default_value_t = RequestMode::Post)]
    pub mode: RequestMode,
    /// Consulta o saldo do 2captcha no servidor em vez de interceptar uma URL
    #[arg(long)]
    pub saldo: bool,
    /// Arquivo onde salvar a URL interceptada
    #[arg(short = 's', long)]
    pub save_url: Option<String>,
}

impl Cli {
    pub fn request_config(&self) -> RequestConfig {
        RequestConfig::new(&self.host, self.port)
    }
}

/// Runs one invocation against the given config, writing everything meant
/// for the user to `out`. Errors are fatal: an invalid key or a local I/O
/// failure. Failed requests are reported to `out` and are not errors.
pub fn run_with_config(
    args: &Cli,
    config: RequestConfig,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if args.saldo {
        let client = NfeApiClient::new(config)?;
        return handle_saldo(&client, out);
    }
    let key = resolve_key(args.chave.as_deref(), out)?;
    let client = NfeApiClient::new(config)?;
    handle_interceptar(args, &client, &key, out)
}

pub fn run(args: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    run_with_config(args, args.request_config(), out)
}

fn resolve_key(raw: Option<&str>, out: &mut impl Write) -> anyhow::Result<InvoiceKey> {
    let Some(raw) = raw else {
        writeln!(out, "Nenhuma chave fornecida. Usando chave de exemplo: {}", SAMPLE_CHAVE)?;
        return Ok(InvoiceKey::sample());
    };
    match InvoiceKey::parse(raw) {
        Ok(key) => Ok(key),
        Err(e) => {
            writeln!(out, "Erro: A chave deve conter 44 dígitos numéricos.")?;
            Err(e).with_context(|| format!("invalid key {raw:?}"))
        }
    }
}

fn handle_interceptar(
    args: &Cli,
    client: &NfeApiClient,
    key: &InvoiceKey,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    print_header(out, key, client.config(), args.mode)?;
    writeln!(
        out,
        "Consultando API NFe: {}",
        client.interceptar_url_endpoint(key, args.mode)
    )?;

    let outcome = client.fetch(key, args.token2captcha.as_deref(), args.mode);
    match &outcome {
        Ok(_) => log::info!("Interception request for {} succeeded", key),
        Err(e) => log::info!("Interception request for {} failed: {}", key, e),
    }
    render(out, &outcome, args.mode)?;

    let (Ok(json), Some(save_url)) = (&outcome, &args.save_url) else {
        return Ok(());
    };
    match InterceptResponse::from_value(json).download_url() {
        Some(url) => {
            write_strings_2_file(url, save_url)
                .with_context(|| format!("could not write url to {save_url}"))?;
            writeln!(out, "\nURL salva em: {}", save_url)?;
        }
        None => log::warn!("No url in the response, nothing written to {}", save_url),
    }
    Ok(())
}

fn handle_saldo(client: &NfeApiClient, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Consultando saldo: {}", client.saldo_endpoint())?;
    let outcome = client.saldo();
    if let Err(e) = &outcome {
        log::info!("Balance request failed: {}", e);
    }
    render_saldo(out, &outcome)?;
    Ok(())
}
