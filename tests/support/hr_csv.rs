use std::path::{Path, PathBuf};

/// Write a small HR export: `rows` employees, every `minority_every`-th one
/// leaving. Carries the constant columns the loader drops by default.
pub fn write_hr_csv(dir: &Path, rows: usize, minority_every: usize) -> PathBuf {
    let path = dir.join("hr.csv");
    let mut text = String::from(
        "Age,Attrition,BusinessTravel,EmployeeCount,MonthlyIncome,OverTime,StandardHours\n",
    );
    let travel = ["Non-Travel", "Travel_Frequently", "Travel_Rarely"];
    for i in 0..rows {
        let leaves = i % minority_every == 0;
        let age = if leaves { 22 + i % 9 } else { 30 + i % 25 };
        let income = if leaves { 2000 + 37 * (i % 40) } else { 4500 + 91 * (i % 60) };
        let overtime = if leaves || i % 7 == 0 { "Yes" } else { "No" };
        text.push_str(&format!(
            "{age},{},{},1,{income},{overtime},80\n",
            if leaves { "Yes" } else { "No" },
            travel[i % travel.len()],
        ));
    }
    std::fs::write(&path, text).unwrap();
    path
}
