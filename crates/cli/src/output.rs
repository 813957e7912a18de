// Terminal rendering of sweep results and batch status

use colored::Colorize;
use eligibility_core::application::{BatchStatus, ProcessedIdentifier, RegisterSummary};
use eligibility_core::domain::STATUS_AUTHORIZED;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SweepRow {
    #[tabled(rename = "CPF")]
    cpf: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Mensagem")]
    mensagem: String,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "CPF")]
    cpf: String,
    #[tabled(rename = "Nome")]
    nome: String,
    #[tabled(rename = "Valor Liberado")]
    valor_liberado: String,
    #[tabled(rename = "Margem")]
    margem: String,
    #[tabled(rename = "Elegível")]
    elegivel: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Mensagem")]
    mensagem: String,
    #[tabled(rename = "Data")]
    data: String,
}

pub fn print_registered(summary: &RegisterSummary) {
    println!(
        "{}",
        format!("✓ Batch {} registered", summary.batch_id).green().bold()
    );
    println!("  {} {}", "Submitted:".bold(), summary.submitted);
    println!("  {} {}", "New rows:".bold(), summary.inserted);
}

pub fn print_sweep(processed: &[ProcessedIdentifier], total: usize) {
    println!();
    println!(
        "{}",
        format!("Sweep: {}/{} identifiers processed", processed.len(), total)
            .cyan()
            .bold()
    );

    let rows: Vec<SweepRow> = processed
        .iter()
        .map(|p| {
            let fields = p.result.status_fields();
            SweepRow {
                cpf: p.identifier.padded(),
                outcome: p.outcome.kind().to_string(),
                status: fields.status,
                mensagem: fields.mensagem,
            }
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }

    let queued = processed
        .iter()
        .filter(|p| p.outcome.is_retryable())
        .count();
    if queued > 0 {
        println!(
            "  {} {} identifier(s) handed to background reprocessing",
            "↻".yellow(),
            queued
        );
    }
}

pub fn print_status(status: &BatchStatus) {
    println!();
    println!("{}", format!("Batch {}", status.batch_id).cyan().bold());

    let rows: Vec<StatusRow> = status
        .rows
        .iter()
        .map(|r| StatusRow {
            cpf: r.cpf.clone(),
            nome: r.nome.clone(),
            valor_liberado: r.valor_liberado.clone(),
            margem: r.margem.clone(),
            elegivel: r.elegivel.clone(),
            status: if r.status == STATUS_AUTHORIZED {
                r.status.green().to_string()
            } else {
                r.status.clone()
            },
            mensagem: r.mensagem.clone(),
            data: r.data.clone(),
        })
        .collect();
    println!("{}", Table::new(rows));
    println!(
        "  {} {}/{}",
        "Authorized:".bold(),
        status.authorized_count(),
        status.rows.len()
    );
}
