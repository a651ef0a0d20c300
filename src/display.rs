use std::io::{self, Write};

use serde_json::Value;

use crate::chave::InvoiceKey;
use crate::nfe_api::{
    DadosNfe, ErrorBody, FetchError, InterceptResponse, RequestConfig, RequestMode, SaldoResponse,
};
use crate::utils::{is_truthy, value_to_display};

static NOT_AVAILABLE: &str = "N/A";

pub fn print_header(
    out: &mut impl Write,
    key: &InvoiceKey,
    config: &RequestConfig,
    mode: RequestMode,
) -> io::Result<()> {
    writeln!(out, "\n========================================")?;
    writeln!(out, "Cliente para API de NFe")?;
    writeln!(out, "========================================")?;
    writeln!(out, "Chave NFe: {}", key)?;
    writeln!(out, "Servidor: {}", config.base_url())?;
    writeln!(out, "Modo: {}", mode_name(mode))?;
    writeln!(out, "\nIniciando requisição...\n")
}

fn mode_name(mode: RequestMode) -> &'static str {
    match mode {
        RequestMode::Get => "GET",
        RequestMode::Post => "POST",
    }
}

/// Prints the outcome of an interception request.
pub fn render(
    out: &mut impl Write,
    outcome: &Result<Value, FetchError>,
    mode: RequestMode,
) -> io::Result<()> {
    let json = match outcome {
        Err(e) => {
            report_failure(out, e)?;
            return writeln!(out, "\n❌ A requisição falhou.");
        }
        // an empty body counts as a failed request
        Ok(json) if !is_truthy(json) => return writeln!(out, "\n❌ A requisição falhou."),
        Ok(json) => json,
    };

    writeln!(out, "\n✅ SUCESSO:")?;
    writeln!(out, "{}", serde_json::to_string_pretty(json)?)?;

    let resp = InterceptResponse::from_value(json);
    if resp.success == Some(false) {
        if let Some(error) = &resp.error {
            writeln!(out, "\nErro do servidor: {}", error)?;
        }
        if let Some(message) = &resp.message {
            writeln!(out, "Mensagem: {}", message)?;
        }
    }
    if let Some(url) = resp.display_url() {
        writeln!(out, "\n📋 URL interceptada com sucesso!")?;
        writeln!(out, "\nURL: {}", url)?;
    }
    if mode == RequestMode::Post {
        if let Some(dados) = &resp.dados_nfe {
            display_invoice(out, Some(dados))?;
        }
    }
    Ok(())
}

pub fn report_failure(out: &mut impl Write, err: &FetchError) -> io::Result<()> {
    match err {
        FetchError::Http { status, body } => {
            writeln!(out, "Erro HTTP: {}", status)?;
            match body {
                ErrorBody::Json(json) => {
                    writeln!(out, "Detalhes: {}", serde_json::to_string_pretty(json)?)
                }
                ErrorBody::Text(text) if !text.is_empty() => writeln!(out, "Resposta: {}", text),
                ErrorBody::Text(_) => Ok(()),
            }
        }
        FetchError::Connection { url } => {
            writeln!(out, "Erro de conexão: Não foi possível conectar a {}", url)?;
            writeln!(out, "Verifique se o servidor da API está rodando.")
        }
        FetchError::Timeout(_) => {
            writeln!(out, "Erro: Timeout na requisição")?;
            writeln!(
                out,
                "A operação pode levar algum tempo devido à resolução de captcha."
            )
        }
        FetchError::Request(msg) => writeln!(out, "Erro na requisição: {}", msg),
    }
}

/// Human readable block for the `dadosNFe` object.
pub fn display_invoice(out: &mut impl Write, data: Option<&Value>) -> io::Result<()> {
    let Some(dados) = data.and_then(DadosNfe::from_value) else {
        return writeln!(out, "Nenhum dado da NFe para exibir.");
    };
    if !dados.encontrados() {
        return writeln!(out, "Não foi possível extrair os dados detalhados da NFe.");
    }

    writeln!(out, "\n📄 DADOS DA NFE:")?;
    let fields = [
        ("Emitente", &dados.emitente),
        ("Destinatário", &dados.destinatario),
        ("Valor", &dados.valor),
        ("Data de Emissão", &dados.data_emissao),
        ("Natureza da Operação", &dados.natureza_operacao),
        ("Status", &dados.status),
    ];
    for (label, value) in fields {
        let shown = value
            .as_ref()
            .map_or_else(|| NOT_AVAILABLE.to_string(), value_to_display);
        writeln!(out, "{}: {}", label, shown)?;
    }

    if let Some(detalhes) = &dados.detalhes {
        writeln!(out, "\nDetalhes:")?;
        for (key, value) in detalhes {
            writeln!(out, "{} {}", key, value_to_display(value))?;
        }
    }
    Ok(())
}

pub fn render_saldo(out: &mut impl Write, outcome: &Result<Value, FetchError>) -> io::Result<()> {
    match outcome {
        Ok(json) => {
            let saldo: SaldoResponse = serde_json::from_value(json.clone()).unwrap_or_default();
            let shown = saldo
                .saldo
                .as_ref()
                .map_or_else(|| NOT_AVAILABLE.to_string(), value_to_display);
            writeln!(out, "Saldo 2Captcha: {}", shown)
        }
        Err(e) => {
            report_failure(out, e)?;
            writeln!(out, "\n❌ A requisição falhou.")
        }
    }
}
