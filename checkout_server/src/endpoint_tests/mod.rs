mod back_office;
mod checkout;
mod helpers;
