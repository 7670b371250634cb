//! Customer commands for `floortrack customers`.

use anyhow::Result;
use chrono::Utc;

use floortrack::app::App;
use floortrack::common::filter::customer_matches;
use floortrack::common::{Customer, CustomerDraft, timestamp};
use floortrack::services::customers::{
    create_customer, delete_customer, get_customer, list_customers, update_customer,
};
use floortrack::services::jobs::customer_jobs;
use floortrack::ui::{Table, icons};

use super::super::{CustomerArgs, CustomersCommands};
use super::jobs::jobs_table;
use super::{confirm, listed, theme};

impl From<CustomerArgs> for CustomerDraft {
    fn from(args: CustomerArgs) -> Self {
        CustomerDraft {
            name: args.name,
            email: args.email,
            phone: args.phone,
            address: args.address,
        }
    }
}

pub async fn cmd_customers(app: &App, command: CustomersCommands) -> Result<()> {
    match command {
        CustomersCommands::List { search } => {
            let search = search.unwrap_or_default();
            let customers = listed("customers", list_customers(&app.api).await);
            let matching: Vec<&Customer> = customers
                .iter()
                .filter(|c| customer_matches(c, &search))
                .collect();

            println!();
            if matching.is_empty() {
                println!("No customers found.");
                println!();
                return Ok(());
            }
            let mut table = Table::new(["ID", "Name", "Email", "Phone", "Address"]);
            for customer in &matching {
                table.row([
                    customer.id.to_string(),
                    customer.name.clone(),
                    customer.email.clone(),
                    customer.phone.clone(),
                    customer.address.clone(),
                ]);
            }
            println!("{}", table.render());
            println!();
        }
        CustomersCommands::Show { id } => {
            let customer = get_customer(&app.api, id).await?;
            print_customer(&customer);
        }
        CustomersCommands::Create { customer } => {
            let created = create_customer(&app.api, &customer.into()).await?;
            println!("{}Created customer {} ({})", icons::CHECK, created.id, created.name);
        }
        CustomersCommands::Update { id, customer } => {
            let updated = update_customer(&app.api, id, &customer.into()).await?;
            println!("{}Updated customer {} ({})", icons::CHECK, updated.id, updated.name);
        }
        CustomersCommands::Delete { id, force } => {
            if !confirm(&format!("Delete customer {}?", id), force)? {
                return Ok(());
            }
            delete_customer(&app.api, id).await?;
            println!("Deleted customer {}.", id);
        }
        CustomersCommands::Jobs { id } => {
            let jobs = listed("customer jobs", customer_jobs(&app.api, id).await);
            println!();
            if jobs.is_empty() {
                println!("No jobs for customer {}.", id);
            } else {
                let refs: Vec<_> = jobs.iter().collect();
                println!("{}", jobs_table(&refs, theme(app), Utc::now()).render());
            }
            println!();
        }
    }
    Ok(())
}

fn print_customer(customer: &Customer) {
    println!();
    println!("{}", console::style(&customer.name).bold());
    println!("  ID:      {}", customer.id);
    println!("  Email:   {}", customer.email);
    println!("  Phone:   {}", customer.phone);
    println!("  Address: {}", customer.address);
    println!("  Created: {}", timestamp::display(&customer.date_created));
    println!();
}
