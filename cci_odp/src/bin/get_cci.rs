/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! command line tool to browse the ESA CCI Open Data Portal and fetch data chunks

use clap::Parser;
use std::fs;
use std::io::Write;

use cci_odp::catalog::{is_valid_drs_id, temporal_resolution_from_drs_id};
use cci_odp::chunks::DataRequest;
use cci_odp::opendap::SliceSpec;
use cci_odp::{misc_error, CciOdp, CciOdpConfig, Result};

#[derive(Parser,Debug)]
#[command(about="ESA CCI Open Data Portal query tool")]
struct Args {
    /// filename of an optional RON config file
    #[arg(short,long)]
    config: Option<String>,

    /// list all available data set ids
    #[arg(short,long)]
    list: bool,

    /// print info and schema of the given data set
    #[arg(short,long)]
    info: Option<String>,

    /// print file time ranges of the given data set
    #[arg(short='t',long)]
    time_ranges: Option<String>,

    /// fetch one chunk of the given data set to a file
    #[arg(long)]
    chunk: Option<String>,

    /// variable name for --chunk
    #[arg(short,long)]
    var: Option<String>,

    /// time chunk index for --chunk
    #[arg(long,default_value="0")]
    time_index: usize,

    /// output filename for --chunk
    #[arg(short,long,default_value="chunk.bin")]
    output: String,

    /// start of the time window (e.g. 1997-05-01T00:00:00)
    #[arg(long)]
    start: Option<String>,

    /// end of the time window
    #[arg(long)]
    end: Option<String>,
}

#[tokio::main]
async fn main ()->Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config: CciOdpConfig = match &args.config {
        Some(filename) => {
            let content = fs::read_to_string(filename)?;
            ron::from_str( &content).map_err( |e| misc_error( format!("failed to load config {filename}: {e}")))?
        }
        None => CciOdpConfig::default()
    };
    let odp = CciOdp::with_config(config)?;

    if args.list {
        for name in odp.dataset_names().await {
            println!("{name}");
        }
        return Ok(())
    }

    if let Some(drs_id) = &args.info {
        if !is_valid_drs_id( drs_id) {
            return Err( misc_error( format!("'{drs_id}' is not a valid DRS id")))
        }
        let info = odp.get_dataset_info( drs_id).await?;
        println!("data set:          {drs_id}");
        println!("crs:               {}", info.crs);
        println!("x_res / y_res:     {} / {}", info.x_res, info.y_res);
        if let Some((minx,miny,maxx,maxy)) = info.bbox {
            println!("bbox:              [{minx},{miny},{maxx},{maxy}]");
        }
        println!("coverage:          {} .. {}",
            info.temporal_coverage_start.as_deref().unwrap_or("?"),
            info.temporal_coverage_end.as_deref().unwrap_or("?"));
        if let Some(period) = temporal_resolution_from_drs_id( drs_id) {
            println!("time period:       {period}");
        }
        println!("coordinates:       {}", info.coord_names.join(", "));
        println!("variables:         {}", info.var_names.join(", "));

        let record = odp.get_dataset_metadata( drs_id).await?;
        if let Some(schema) = &record.schema {
            let mut names: Vec<&String> = schema.variable_infos.keys().collect();
            names.sort();
            println!("\nvariable schema ({} files in archive):", schema.num_files);
            for name in names {
                let vi = &schema.variable_infos[name];
                println!("  {:30} {:10} shape {:?} chunks {:?}", name, vi.data_type.name(), vi.shape, vi.chunk_sizes);
            }
        }
        return Ok(())
    }

    if let Some(drs_id) = &args.time_ranges {
        let ranges = odp.get_time_ranges_from_data( drs_id, args.start.as_deref(), args.end.as_deref()).await;
        for (start, end) in ranges {
            println!("{} .. {}", start.format("%Y-%m-%dT%H:%M:%S"), end.format("%Y-%m-%dT%H:%M:%S"));
        }
        return Ok(())
    }

    if let Some(drs_id) = &args.chunk {
        let var = args.var.as_deref().ok_or_else( || misc_error("--chunk requires --var"))?;

        let data = if args.start.is_some() || args.end.is_some() {
            let request = DataRequest {
                parent_identifier: None,
                drs_id: drs_id.clone(),
                start_date: args.start.clone(),
                end_date: args.end.clone(),
                var_names: vec![ var.to_string() ],
            };
            odp.get_data_chunk( &request, &[SliceSpec::All]).await
        } else {
            // no explicit window - address the file through the logical time chunk index
            let record = odp.get_dataset_metadata( drs_id).await?;
            let rank = record.schema.as_ref()
                .and_then( |s| s.variable_infos.get(var))
                .map( |vi| vi.dimensions.len())
                .unwrap_or(1);
            let mut chunk_indices = vec![0; rank];
            if let Some(first) = chunk_indices.first_mut() {
                *first = args.time_index;
            }
            odp.resolve_chunk( drs_id, var, &chunk_indices).await
        };
        let data = data.ok_or_else( || misc_error( format!("no data for {var} of {drs_id}")))?;

        let mut file = fs::File::create( &args.output)?;
        file.write_all( &data)?;
        println!("{} bytes written to {}", data.len(), args.output);
        return Ok(())
    }

    println!("nothing to do (try --help)");
    Ok(())
}
